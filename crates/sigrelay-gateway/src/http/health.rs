use axum::{extract::State, Json};
use serde_json::{json, Value};
use sigrelay_core::config::HISTORY_CAPACITY;
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "subscribers": state.broadcaster.subscriber_count(),
        "history": state.broadcaster.history_len(),
        "history_capacity": HISTORY_CAPACITY,
    }))
}
