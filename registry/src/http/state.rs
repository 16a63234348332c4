use std::sync::Arc;
use std::time::Duration;

use crate::registry::{EventStorage, RequestContext};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<EventStorage>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Context for one request against `namespace`, bounded by the request timeout
    pub fn context(&self, namespace: &str) -> RequestContext {
        RequestContext::new()
            .with_namespace(namespace)
            .with_timeout(self.request_timeout)
    }
}
