use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use event_types::{Event, EventList};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// GET /api/v1/namespaces/:namespace/events
/// List the live events in a namespace
#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
) -> ApiResult<Json<EventList>> {
    let items = state.storage.list(&state.context(&namespace)).await?;
    Ok(Json(EventList { items }))
}

/// POST /api/v1/namespaces/:namespace/events
/// Create an event; fails if the name is taken
#[instrument(skip(state, event), fields(name = %event.metadata.name))]
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    Json(event): Json<Event>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let created = state.storage.create(&state.context(&namespace), event).await?;
    info!(
        "Created event {} at version {}",
        created, created.metadata.resource_version
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/namespaces/:namespace/events/:name
#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<Event>> {
    let event = state.storage.get(&state.context(&namespace), &name).await?;
    Ok(Json(event))
}

/// PUT /api/v1/namespaces/:namespace/events/:name
/// Replace an event, creating it if absent
#[instrument(skip(state, event))]
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
    Json(mut event): Json<Event>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    if event.metadata.name.is_empty() {
        event.metadata.name.clone_from(&name);
    } else if event.metadata.name != name {
        return Err(ApiError::BadRequest(format!(
            "name {:?} in body does not match name {:?} in path",
            event.metadata.name, name
        )));
    }

    let (stored, created) = state
        .storage
        .update(&state.context(&namespace), event)
        .await?;
    info!(
        "{} event {} at version {}",
        if created { "Created" } else { "Updated" },
        stored,
        stored.metadata.resource_version
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(stored)))
}

/// DELETE /api/v1/namespaces/:namespace/events/:name
/// Delete an event, returning its last stored state
#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<Event>> {
    let deleted = state
        .storage
        .delete(&state.context(&namespace), &name)
        .await?;
    info!("Deleted event {}", deleted);
    Ok(Json(deleted))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "event-registry",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
