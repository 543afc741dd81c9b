use thiserror::Error;

/// Why a frame could not be handed to a subscriber channel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SinkError {
    /// The receiving side is gone (client disconnected).
    #[error("subscriber channel closed")]
    Closed,

    /// The subscriber stopped draining and its queue is full.
    #[error("subscriber queue full ({capacity} frames)")]
    Lagging { capacity: usize },
}
