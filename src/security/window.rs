//! Sliding-window counter.
//!
//! Records one event per call and reports whether the key is over capacity.
//! Stale events are purged lazily on access.
//!
//! # Design Decisions
//! - Check-then-commit: a rejected attempt is not recorded
//! - Prune, check and append happen under the key's own lock, so two callers
//!   sharing a key can never both take the last slot
//! - `capacity == 0` rejects everything; a zero window is refused at construction

use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::security::store::KeyedStore;
use crate::security::SecurityError;

/// Outcome of recording one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Event recorded. `remaining` is the capacity left in the current window.
    Allowed { remaining: u32 },
    /// Over capacity. Capacity frees up after `retry_after`.
    Rejected { retry_after: Duration },
    /// The key could not be tracked (store full); let it through.
    Untracked,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Rejected { .. })
    }
}

/// Per-key sliding-window counter.
#[derive(Debug)]
pub struct SlidingWindow<K: Eq + Hash> {
    capacity: u32,
    store: KeyedStore<K>,
}

impl<K: Eq + Hash + Clone> SlidingWindow<K> {
    pub fn new(
        name: &'static str,
        capacity: u32,
        window: Duration,
        max_keys: usize,
    ) -> Result<Self, SecurityError> {
        if window.is_zero() {
            return Err(SecurityError::InvalidWindow(name));
        }
        if max_keys == 0 {
            return Err(SecurityError::InvalidKeyCap(name));
        }
        Ok(Self {
            capacity,
            store: KeyedStore::new(name, window, max_keys),
        })
    }

    /// Record an event for `key` at `now` if capacity allows.
    pub fn record(&self, key: &K, now: Instant) -> Decision {
        let window = self.store.window();
        if self.capacity == 0 {
            return Decision::Rejected { retry_after: window };
        }

        let capacity = self.capacity as usize;
        self.store
            .with_record(key, now, |events| {
                if events.len() >= capacity {
                    Decision::Rejected {
                        retry_after: events.time_until_oldest_expires(now, window),
                    }
                } else {
                    events.push(now);
                    Decision::Allowed {
                        remaining: (capacity - events.len()) as u32,
                    }
                }
            })
            .unwrap_or(Decision::Untracked)
    }

    /// Events currently inside the window for `key`.
    pub fn count(&self, key: &K, now: Instant) -> usize {
        self.store.with_existing(key, now, |events| events.len()).unwrap_or(0)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window(&self) -> Duration {
        self.store.window()
    }

    /// Number of keys currently held.
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    /// Drop keys whose events have all aged out.
    pub fn sweep(&self, now: Instant) -> usize {
        self.store.sweep(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const MINUTE: Duration = Duration::from_secs(60);

    fn counter(capacity: u32) -> SlidingWindow<String> {
        SlidingWindow::new("test", capacity, MINUTE, 1_000).unwrap()
    }

    #[test]
    fn test_capacity_then_reject_then_recover() {
        let window = counter(3);
        let key = "client".to_string();
        let start = Instant::now();

        for i in 0..3u64 {
            let at = start + Duration::from_secs(i * 10);
            assert!(window.record(&key, at).is_allowed(), "event {i} should pass");
        }

        let decision = window.record(&key, start + Duration::from_secs(30));
        assert_eq!(decision, Decision::Rejected { retry_after: Duration::from_secs(30) });

        // Past one window from the oldest event, one slot frees up
        assert!(window.record(&key, start + MINUTE).is_allowed());
        assert!(!window.record(&key, start + MINUTE).is_allowed());
    }

    #[test]
    fn test_rejected_attempts_are_not_counted() {
        let window = counter(2);
        let key = "client".to_string();
        let start = Instant::now();

        window.record(&key, start);
        window.record(&key, start);
        for _ in 0..10 {
            assert!(!window.record(&key, start + Duration::from_secs(1)).is_allowed());
        }
        assert_eq!(window.count(&key, start + Duration::from_secs(1)), 2);

        // Only the two accepted events must age out
        assert!(window.record(&key, start + MINUTE).is_allowed());
    }

    #[test]
    fn test_remaining_counts_down() {
        let window = counter(2);
        let key = "client".to_string();
        let now = Instant::now();
        assert_eq!(window.record(&key, now), Decision::Allowed { remaining: 1 });
        assert_eq!(window.record(&key, now), Decision::Allowed { remaining: 0 });
    }

    #[test]
    fn test_keys_are_independent() {
        let window = counter(1);
        let now = Instant::now();
        assert!(window.record(&"a".to_string(), now).is_allowed());
        assert!(!window.record(&"a".to_string(), now).is_allowed());
        assert!(window.record(&"b".to_string(), now).is_allowed());
    }

    #[test]
    fn test_zero_capacity_always_rejects() {
        let window = counter(0);
        let decision = window.record(&"a".to_string(), Instant::now());
        assert_eq!(decision, Decision::Rejected { retry_after: MINUTE });
        assert_eq!(window.tracked_keys(), 0);
    }

    #[test]
    fn test_zero_window_is_invalid() {
        let result: Result<SlidingWindow<String>, _> = SlidingWindow::new("test", 5, Duration::ZERO, 10);
        assert!(matches!(result, Err(SecurityError::InvalidWindow("test"))));
    }

    #[test]
    fn test_concurrent_callers_never_exceed_capacity() {
        let window = Arc::new(counter(100));
        let allowed = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let window = Arc::clone(&window);
                let allowed = Arc::clone(&allowed);
                std::thread::spawn(move || {
                    if window.record(&"burst".to_string(), now).is_allowed() {
                        allowed.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(allowed.load(Ordering::SeqCst), 100);
        assert_eq!(window.count(&"burst".to_string(), now), 100);
    }
}
