use serde::{Deserialize, Serialize};
use sigrelay_core::error::Result;
use std::sync::Arc;

use crate::signal::Signal;

/// Text of the SSE comment used as the liveness frame (`: heartbeat`).
pub const HEARTBEAT_COMMENT: &str = "heartbeat";

/// Server → subscriber data event.
/// Wire: `{"type":"history","signals":[...]}` | `{"type":"signal","signal":{...}}` | `{"type":"clear"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayEvent {
    History { signals: Vec<Arc<Signal>> },
    Signal { signal: Arc<Signal> },
    Clear,
}

impl RelayEvent {
    /// Event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            RelayEvent::History { .. } => "history",
            RelayEvent::Signal { .. } => "signal",
            RelayEvent::Clear => "clear",
        }
    }
}

/// One unit written to a subscriber channel.
///
/// Data frames carry the event already serialized, so a publish encodes once
/// and every subscriber shares the same buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(Arc<str>),
    Heartbeat,
}

impl Frame {
    pub fn encode(event: &RelayEvent) -> Result<Self> {
        Ok(Frame::Data(serde_json::to_string(event)?.into()))
    }

    /// JSON text of a data frame; `None` for the liveness frame.
    pub fn data(&self) -> Option<&str> {
        match self {
            Frame::Data(json) => Some(&**json),
            Frame::Heartbeat => None,
        }
    }

    /// Parse a data frame back into its event.
    pub fn decode(&self) -> Option<RelayEvent> {
        self.data().and_then(|json| serde_json::from_str(json).ok())
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Frame::Heartbeat)
    }
}
