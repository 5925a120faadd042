//! Read-only HTTP surface over the event log.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use std::sync::Arc;
use tracing::debug;

use crate::events::EventLog;

/// Build the status router. Handlers only ever take snapshots of the log.
pub fn build_status_router(log: Arc<EventLog>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .with_state(log)
}

/// Recorded events, oldest first.
async fn status_handler(State(log): State<Arc<EventLog>>) -> impl IntoResponse {
    let events = log.snapshot();
    debug!("Serving {} events", events.len());
    Json(events)
}
