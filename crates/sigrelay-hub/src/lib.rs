//! In-memory signal distribution: a bounded history for late joiners and a
//! fan-out registry of live subscriber channels.

pub mod broadcaster;
pub mod error;
pub mod history;
mod keepalive;
pub mod sink;

pub use broadcaster::{Broadcaster, Subscription};
pub use error::SinkError;
pub use history::HistoryStore;
pub use sink::SignalSink;
