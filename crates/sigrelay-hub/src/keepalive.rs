use sigrelay_core::SubscriberId;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::broadcaster::Shared;

/// Per-subscriber liveness timer. Aborted when dropped, so removing a channel
/// from the registry always stops its timer.
pub(crate) struct KeepaliveTimer {
    handle: JoinHandle<()>,
}

impl KeepaliveTimer {
    /// Spawn the timer on the current tokio runtime.
    /// Returns `None` outside a runtime, or when `every` is too large to
    /// schedule (the channel then gets no heartbeats).
    pub(crate) fn start(hub: Weak<Shared>, id: SubscriberId, every: Duration) -> Option<Self> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        // first tick one full interval after subscribe, not immediately
        let Some(first) = Instant::now().checked_add(every) else {
            warn!(subscriber_id = %id, ?every, "keepalive interval out of range, timer not started");
            return None;
        };
        let handle = runtime.spawn(async move {
            let mut tick = tokio::time::interval_at(first, every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                let Some(shared) = hub.upgrade() else { break };
                if !shared.heartbeat(&id) {
                    debug!(subscriber_id = %id, "keepalive timer stopped");
                    break;
                }
            }
        });
        Some(Self { handle })
    }
}

impl Drop for KeepaliveTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
