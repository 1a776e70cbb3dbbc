use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use autostream_memory::SessionStore;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<SessionStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub sessions: usize,
    pub capacity: usize,
    pub checked_at: String,
}

pub fn router(store: Arc<SessionStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

/// The registry is in-process memory, so readiness has no degraded mode; the
/// payload still carries live counters for operators.
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    let stats = state.store.stats();
    Json(HealthResponse {
        status: "ready",
        service: "autostream-server",
        sessions: stats.total_sessions,
        capacity: stats.max_sessions,
        checked_at: Utc::now().to_rfc3339(),
    })
}
