use sigrelay_core::config::HISTORY_CAPACITY;
use sigrelay_protocol::Signal;
use std::collections::VecDeque;
use std::sync::Arc;

/// Bounded FIFO of the most recent signals, oldest first.
///
/// Not synchronized on its own; the [`Broadcaster`](crate::Broadcaster) owns
/// it behind the same lock as the subscriber registry.
#[derive(Debug)]
pub struct HistoryStore {
    signals: VecDeque<Arc<Signal>>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            signals: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
            capacity: HISTORY_CAPACITY,
        }
    }

    /// Push to the back. Returns the evicted signal when the store was full.
    pub fn append(&mut self, signal: Arc<Signal>) -> Option<Arc<Signal>> {
        self.signals.push_back(signal);
        if self.signals.len() > self.capacity {
            self.signals.pop_front()
        } else {
            None
        }
    }

    /// Drop everything. Returns how many signals were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.signals.len();
        self.signals.clear();
        n
    }

    /// Owned copy in insertion order; unaffected by later mutations.
    pub fn snapshot(&self) -> Vec<Arc<Signal>> {
        self.signals.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use sigrelay_protocol::SignalPayload;

    fn signal(id: u64) -> Arc<Signal> {
        let payload = SignalPayload::from_value(json!({"type": format!("S{id}")})).unwrap();
        Arc::new(Signal::new(payload, Utc::now(), id))
    }

    fn ids(signals: &[Arc<Signal>]) -> Vec<u64> {
        signals.iter().map(|s| s.id()).collect()
    }

    #[test]
    fn fifty_first_append_evicts_the_oldest() {
        let mut store = HistoryStore::new();
        for id in 1..=50 {
            assert!(store.append(signal(id)).is_none());
        }
        let evicted = store.append(signal(51)).expect("store was full");
        assert_eq!(evicted.id(), 1);
        assert_eq!(ids(&store.snapshot()), (2..=51).collect::<Vec<_>>());
    }

    #[test]
    fn long_runs_keep_the_last_fifty_in_order() {
        let mut store = HistoryStore::new();
        for id in 1..=437 {
            store.append(signal(id));
            assert!(store.len() <= store.capacity());
        }
        assert_eq!(store.len(), 50);
        assert_eq!(ids(&store.snapshot()), (388..=437).collect::<Vec<_>>());
    }

    #[test]
    fn short_runs_keep_everything() {
        let mut store = HistoryStore::new();
        for id in 1..=7 {
            store.append(signal(id));
        }
        assert_eq!(ids(&store.snapshot()), (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn clear_empties_and_reports_count() {
        let mut store = HistoryStore::new();
        store.append(signal(1));
        store.append(signal(2));
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(store.clear(), 0);
    }

    #[test]
    fn snapshot_is_detached_from_later_mutations() {
        let mut store = HistoryStore::new();
        store.append(signal(1));
        let before = store.snapshot();
        store.append(signal(2));
        store.clear();
        assert_eq!(ids(&before), vec![1]);
    }
}
