//! Signal ingress: POST /webhook and POST /test.
//!
//! Both routes accept a JSON object with a truthy `type` field, stamp it with
//! `time` and `id`, append it to history and push it to every subscriber.
//! The body is parsed regardless of content type: alert services commonly
//! post JSON as `text/plain`.
//!
//! Response: `{"ok": true}`, or 400 with `{"error": "..."}`.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use sigrelay_core::RelayError;
use sigrelay_protocol::{Signal, SignalPayload};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::app::AppState;

type Rejection = (StatusCode, Json<Value>);

/// POST /webhook: entry point for the external alert sender.
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, Rejection> {
    let signal = ingest(&state, "webhook", &body, "Invalid payload")?;
    info!(id = signal.id(), kind = %signal.kind(), "signal received");
    debug!(signal = ?signal, "signal payload");
    Ok(Json(json!({"ok": true})))
}

/// POST /test: same path, for manual testing from a browser.
pub async fn test_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, Rejection> {
    let signal = ingest(&state, "test", &body, "Invalid")?;
    debug!(id = signal.id(), kind = %signal.kind(), "test signal received");
    Ok(Json(json!({"ok": true})))
}

fn ingest(
    state: &AppState,
    source: &str,
    body: &[u8],
    rejection: &str,
) -> Result<Arc<Signal>, Rejection> {
    let payload = SignalPayload::parse(body).map_err(|e| {
        let err = RelayError::from(e);
        warn!(source, code = err.code(), error = %err, bytes = body.len(), "payload rejected");
        (StatusCode::BAD_REQUEST, Json(json!({"error": rejection})))
    })?;
    Ok(state.broadcaster.ingest(payload))
}
