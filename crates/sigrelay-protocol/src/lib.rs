pub mod frames;
pub mod signal;

pub use frames::{Frame, RelayEvent, HEARTBEAT_COMMENT};
pub use signal::{IngestError, Signal, SignalClock, SignalPayload};
