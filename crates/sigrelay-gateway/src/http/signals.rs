use axum::{extract::State, Json};
use serde_json::{json, Value};
use sigrelay_protocol::Signal;
use std::sync::Arc;

use crate::app::AppState;

/// GET /signals: current history as a JSON array, oldest first.
pub async fn list_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Arc<Signal>>> {
    Json(state.broadcaster.snapshot())
}

/// DELETE /signals: drop the history and send `{type:"clear"}` to subscribers.
pub async fn clear_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.broadcaster.clear();
    Json(json!({"ok": true}))
}
