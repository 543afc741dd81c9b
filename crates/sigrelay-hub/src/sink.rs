use sigrelay_protocol::Frame;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::SinkError;

/// Anything that accepts a framed message and may fail.
///
/// Called while the broadcaster holds its lock, so implementations must not
/// block or await.
pub trait SignalSink: Send + Sync {
    fn deliver(&self, frame: Frame) -> Result<(), SinkError>;
}

impl SignalSink for mpsc::Sender<Frame> {
    fn deliver(&self, frame: Frame) -> Result<(), SinkError> {
        self.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Lagging {
                capacity: self.max_capacity(),
            },
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

impl SignalSink for mpsc::UnboundedSender<Frame> {
    fn deliver(&self, frame: Frame) -> Result<(), SinkError> {
        self.send(frame).map_err(|_| SinkError::Closed)
    }
}
