use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use sigrelay_protocol::{Frame, HEARTBEAT_COMMENT};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app::AppState;

/// GET /events: one long-lived SSE stream per browser.
///
/// The first event is the history snapshot, then live events as they are
/// published, interleaved with `: heartbeat` comments from the subscriber's
/// keepalive timer.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
    // mpsc panics on a zero capacity; only `RelayConfig::load` rejects it
    let buffer = state.config.hub.subscriber_buffer.max(1);
    let (tx, mut rx) = mpsc::channel::<Frame>(buffer);
    let subscription = state.broadcaster.subscribe(tx);

    let stream = async_stream::stream! {
        // lives as long as the response body; dropped when the client disconnects
        let _subscription = subscription;
        while let Some(frame) = rx.recv().await {
            yield Ok(to_event(&frame));
        }
    };

    Sse::new(stream)
}

fn to_event(frame: &Frame) -> Event {
    match frame {
        Frame::Data(json) => Event::default().data(&**json),
        Frame::Heartbeat => Event::default().comment(HEARTBEAT_COMMENT),
    }
}
