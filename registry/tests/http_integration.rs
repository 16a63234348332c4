#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use bytes::Bytes;
use event_registry::http::{AppState, dto::ErrorResponse, router};
use event_registry::registry::{StorageOptions, new_event_storage};
use event_registry::storage::{ObjectStoreClient, StoreClient, StoreError, StoreNode};
use event_types::{Event, EventList, ObjectReference};
use object_store::memory::InMemory;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

fn app_with(client: Arc<dyn StoreClient>, request_timeout: Duration) -> Router {
    let storage = new_event_storage(client, StorageOptions::default());
    router(Arc::new(AppState {
        storage: Arc::new(storage),
        request_timeout,
    }))
}

fn create_test_app() -> Router {
    let client = ObjectStoreClient::new(Arc::new(InMemory::new()));
    app_with(Arc::new(client), Duration::from_secs(5))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, Bytes) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();

    let (status, body) = call(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_event_round_trip() {
    let app = create_test_app();
    let uri = "/api/v1/namespaces/default/events";

    // Create from a sparse document; system fields in the body are ignored
    let (status, body) = call(
        &app,
        "POST",
        uri,
        Some(serde_json::json!({
            "metadata": {"name": "scheduled", "uid": "forged", "resourceVersion": "99"},
            "involvedObject": {"kind": "Pod", "name": "web-0"},
            "reason": "Scheduled",
            "count": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Event = serde_json::from_slice(&body).unwrap();
    assert_eq!(created.metadata.namespace, "default");
    assert_eq!(created.metadata.resource_version, "1");
    assert_ne!(created.metadata.uid, "forged");
    assert_eq!(created.involved_object.kind, "Pod");

    // Bump the count against the version just read
    let mut next = created.clone();
    next.count = 2;
    let (status, body) = call(
        &app,
        "PUT",
        &format!("{uri}/scheduled"),
        Some(serde_json::to_value(&next).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Event = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated.count, 2);
    assert_eq!(updated.metadata.resource_version, "2");
    assert_eq!(updated.metadata.uid, created.metadata.uid);

    // A writer still holding version 1 loses
    let (status, body) = call(
        &app,
        "PUT",
        &format!("{uri}/scheduled"),
        Some(serde_json::to_value(&created).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert!(error.details.is_some());

    let (status, body) = call(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let list: EventList = serde_json::from_slice(&body).unwrap();
    assert_eq!(list.items, vec![updated]);
}

#[tokio::test]
async fn test_malformed_resource_version_is_bad_request() {
    let app = create_test_app();
    let mut event = Event::new("default", "scheduled")
        .with_involved_object(ObjectReference::new("default", "web-0"));
    event.metadata.resource_version = "latest".to_string();

    let (status, _) = call(
        &app,
        "PUT",
        "/api/v1/namespaces/default/events/scheduled",
        Some(serde_json::to_value(&event).unwrap()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_name_is_bad_request() {
    let app = create_test_app();

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/namespaces/default/events",
        Some(serde_json::json!({"metadata": {"name": ".."}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Accepts every call and never answers
struct HangingStore;

#[async_trait]
impl StoreClient for HangingStore {
    async fn get(&self, _key: &str) -> Result<StoreNode, StoreError> {
        std::future::pending().await
    }

    async fn create_if_absent(
        &self,
        _key: &str,
        _value: Bytes,
        _ttl: Option<Duration>,
    ) -> Result<StoreNode, StoreError> {
        std::future::pending().await
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _value: Bytes,
        _expected_index: u64,
        _ttl: Option<Duration>,
    ) -> Result<StoreNode, StoreError> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<StoreNode, StoreError> {
        std::future::pending().await
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<StoreNode>, StoreError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_unresponsive_store_is_service_unavailable() {
    let app = app_with(Arc::new(HangingStore), Duration::from_millis(20));

    let uri = "/api/v1/namespaces/default/events/scheduled";
    let (status, body) = call(&app, "GET", uri, None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.error, "Service Unavailable");
}
