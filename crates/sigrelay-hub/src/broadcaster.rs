use sigrelay_core::{config::HubConfig, SubscriberId};
use sigrelay_protocol::{Frame, RelayEvent, Signal, SignalClock, SignalPayload};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::SinkError;
use crate::history::HistoryStore;
use crate::keepalive::KeepaliveTimer;
use crate::sink::SignalSink;

/// Fan-out of relay events to every connected subscriber, plus the bounded
/// history replayed to each new one.
///
/// History and registry share one lock and every operation runs start to
/// finish inside it. Sink writes never block, so nothing awaits while the
/// lock is held. This gives:
/// - delivery order equal to ingestion order for every subscriber;
/// - no gap and no duplicate between a subscriber's history snapshot and its
///   first live event.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Broadcaster {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    state: Mutex<HubState>,
    keepalive: Option<Duration>,
}

struct HubState {
    history: HistoryStore,
    clock: SignalClock,
    channels: HashMap<SubscriberId, Channel>,
}

/// Registry entry for one ACTIVE subscriber.
struct Channel {
    sink: Box<dyn SignalSink>,
    _keepalive: Option<KeepaliveTimer>,
}

impl Broadcaster {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(HubState {
                    history: HistoryStore::new(),
                    clock: SignalClock::new(),
                    channels: HashMap::new(),
                }),
                keepalive: config.keepalive_interval(),
            }),
        }
    }

    /// Register a new subscriber and replay the current history to it.
    ///
    /// The channel enters the registry first and the history snapshot is taken
    /// afterwards, so no event can fall between the two. If the history frame
    /// cannot be written the channel is closed again before this returns.
    ///
    /// Dropping the returned guard unsubscribes.
    pub fn subscribe<S: SignalSink + 'static>(&self, sink: S) -> Subscription {
        let id = SubscriberId::new();
        let keepalive = self.shared.keepalive.and_then(|every| {
            KeepaliveTimer::start(Arc::downgrade(&self.shared), id.clone(), every)
        });

        let mut state = self.shared.lock();
        state.channels.insert(
            id.clone(),
            Channel {
                sink: Box::new(sink),
                _keepalive: keepalive,
            },
        );

        let signals = state.history.snapshot();
        let replayed = signals.len();
        let history = RelayEvent::History { signals };
        let outcome = match Frame::encode(&history) {
            Ok(frame) => state.deliver_to(&id, frame),
            Err(e) => {
                error!(error = %e, "failed to encode history snapshot");
                Err(SinkError::Closed)
            }
        };
        match outcome {
            Ok(()) => info!(
                subscriber_id = %id,
                replayed,
                subscribers = state.channels.len(),
                "subscriber connected"
            ),
            Err(e) => state.drop_channel(&id, &e),
        }
        drop(state);

        Subscription {
            id,
            hub: self.clone(),
        }
    }

    /// Remove a subscriber from the fan-out. Returns `false` if it was not
    /// registered (already closed); calling this twice is harmless.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        let mut state = self.shared.lock();
        let removed = state.channels.remove(id).is_some();
        if removed {
            info!(
                subscriber_id = %id,
                subscribers = state.channels.len(),
                "subscriber disconnected"
            );
        }
        removed
    }

    /// Serialize `event` once and write it to every active subscriber.
    ///
    /// Subscribers whose write fails are unsubscribed; the rest still receive
    /// the event. Returns how many subscribers it reached.
    pub fn publish(&self, event: &RelayEvent) -> usize {
        self.shared.lock().publish(event)
    }

    /// Stamp a validated payload with `time` and `id`, append it to history and
    /// publish it as one step.
    pub fn ingest(&self, payload: SignalPayload) -> Arc<Signal> {
        let mut state = self.shared.lock();
        let signal = state.clock.stamp(payload);
        state.record(signal)
    }

    /// Append an already stamped signal to history and publish it.
    pub fn record(&self, signal: Signal) -> Arc<Signal> {
        self.shared.lock().record(signal)
    }

    /// Empty the history and tell every subscriber. Returns how many signals
    /// were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.shared.lock();
        let cleared = state.history.clear();
        let reached = state.publish(&RelayEvent::Clear);
        info!(cleared, reached, "history cleared");
        cleared
    }

    /// Write a liveness frame to every active subscriber. Nothing is recorded
    /// in history. Returns how many subscribers it reached.
    pub fn keepalive(&self) -> usize {
        self.shared.lock().write_all(Frame::Heartbeat)
    }

    /// Copy of the current history, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<Signal>> {
        self.shared.lock().history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.shared.lock().history.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().channels.len()
    }

    pub fn is_subscribed(&self, id: &SubscriberId) -> bool {
        self.shared.lock().channels.contains_key(id)
    }

    /// Deregister every subscriber, ending their streams. Used at shutdown.
    pub fn close_all(&self) -> usize {
        let mut state = self.shared.lock();
        let closed = state.channels.len();
        state.channels.clear();
        info!(closed, "all subscribers closed");
        closed
    }
}

impl Shared {
    /// Every operation leaves the state consistent, so a poisoned lock is
    /// still safe to use.
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send one liveness frame to a single subscriber. Returns `false` once the
    /// subscriber is gone, which stops its timer.
    pub(crate) fn heartbeat(&self, id: &SubscriberId) -> bool {
        let mut state = self.lock();
        match state.deliver_to(id, Frame::Heartbeat) {
            Ok(()) => true,
            Err(e) => {
                state.drop_channel(id, &e);
                false
            }
        }
    }
}

impl HubState {
    fn record(&mut self, signal: Signal) -> Arc<Signal> {
        let signal = Arc::new(signal);
        if let Some(evicted) = self.history.append(Arc::clone(&signal)) {
            debug!(evicted_id = evicted.id(), "history full, oldest signal evicted");
        }
        self.publish(&RelayEvent::Signal {
            signal: Arc::clone(&signal),
        });
        signal
    }

    fn publish(&mut self, event: &RelayEvent) -> usize {
        match Frame::encode(event) {
            Ok(frame) => self.write_all(frame),
            Err(e) => {
                error!(event = event.name(), error = %e, "failed to encode event");
                0
            }
        }
    }

    fn write_all(&mut self, frame: Frame) -> usize {
        let mut failed = Vec::new();
        for (id, channel) in &self.channels {
            if let Err(e) = channel.sink.deliver(frame.clone()) {
                failed.push((id.clone(), e));
            }
        }
        for (id, e) in &failed {
            self.drop_channel(id, e);
        }
        self.channels.len()
    }

    fn deliver_to(&self, id: &SubscriberId, frame: Frame) -> Result<(), SinkError> {
        match self.channels.get(id) {
            Some(channel) => channel.sink.deliver(frame),
            None => Err(SinkError::Closed),
        }
    }

    fn drop_channel(&mut self, id: &SubscriberId, reason: &SinkError) {
        if self.channels.remove(id).is_none() {
            return;
        }
        match reason {
            SinkError::Closed => debug!(subscriber_id = %id, "subscriber went away, removed"),
            SinkError::Lagging { .. } => {
                warn!(subscriber_id = %id, error = %reason, "slow subscriber removed")
            }
        }
    }
}

/// Handle for one registered subscriber. Dropping it unsubscribes, so the
/// channel is cleaned up on every exit path of the connection task.
pub struct Subscription {
    id: SubscriberId,
    hub: Broadcaster,
}

impl Subscription {
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// `false` once the subscriber has been removed for any reason.
    pub fn is_active(&self) -> bool {
        self.hub.is_subscribed(&self.id)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.id);
    }
}
