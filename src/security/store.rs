//! Keyed record storage with per-key locking.
//!
//! # Design Decisions
//! - The map is only used to find or insert a slot; record mutation happens
//!   under the slot's own mutex so unrelated keys never wait on each other
//! - A slot is marked retired under its mutex before it leaves the map, and
//!   writers that see a retired slot retry against a fresh one
//! - Lock order is always slot mutex → map shard; sweeps only `try_lock`
//! - Growth is bounded: at the cap, stale records are swept on insert, at
//!   most once per `window / SWEEP_DIVISOR` so a flood of new keys cannot
//!   turn every insert into a full scan

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::observability::metrics;

/// At-cap sweeps run at most once per this fraction of the window.
const SWEEP_DIVISOR: u32 = 10;

/// Ascending event timestamps owned by one key.
#[derive(Debug, Default)]
pub struct Timestamps {
    events: VecDeque<Instant>,
}

impl Timestamps {
    /// Drop every event at least `window` old.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.events.front() {
            if now.duration_since(*oldest) >= window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn push(&mut self, at: Instant) {
        self.events.push_back(at);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn oldest(&self) -> Option<Instant> {
        self.events.front().copied()
    }

    /// Time until the oldest event leaves the window.
    pub fn time_until_oldest_expires(&self, now: Instant, window: Duration) -> Duration {
        self.oldest()
            .map(|oldest| window.saturating_sub(now.duration_since(oldest)))
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Default)]
struct Slot {
    retired: bool,
    record: Timestamps,
}

type SharedSlot = Arc<Mutex<Slot>>;

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Map from key to timestamp record.
#[derive(Debug)]
pub struct KeyedStore<K: Eq + Hash> {
    name: &'static str,
    window: Duration,
    max_keys: usize,
    slots: DashMap<K, SharedSlot>,
    last_sweep: Mutex<Option<Instant>>,
}

impl<K: Eq + Hash + Clone> KeyedStore<K> {
    pub fn new(name: &'static str, window: Duration, max_keys: usize) -> Self {
        Self {
            name,
            window,
            max_keys,
            slots: DashMap::new(),
            last_sweep: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `f` on the record for `key`, creating it if absent.
    ///
    /// Returns `None` when the key is new and the store is full even after
    /// a sweep.
    pub fn with_record<T>(&self, key: &K, now: Instant, f: impl FnOnce(&mut Timestamps) -> T) -> Option<T> {
        loop {
            let slot = self.find_or_insert(key, now)?;
            let mut guard = lock(&slot);
            if guard.retired {
                continue;
            }
            guard.record.prune(now, self.window);
            return Some(f(&mut guard.record));
        }
    }

    /// Run `f` on the record for `key` only if it exists.
    pub fn with_existing<T>(&self, key: &K, now: Instant, f: impl FnOnce(&mut Timestamps) -> T) -> Option<T> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let mut guard = lock(&slot);
        if guard.retired {
            return None;
        }
        guard.record.prune(now, self.window);
        Some(f(&mut guard.record))
    }

    /// Delete the record for `key`. Returns whether one existed.
    pub fn remove(&self, key: &K) -> bool {
        let Some(slot) = self.slots.get(key).map(|s| Arc::clone(s.value())) else {
            return false;
        };
        let mut guard = lock(&slot);
        if guard.retired {
            return false;
        }
        guard.retired = true;
        self.slots.remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
        true
    }

    /// Remove every record whose events have all aged out.
    ///
    /// Slots currently locked by a request are skipped.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| match slot.try_lock() {
            Ok(mut guard) => {
                guard.record.prune(now, self.window);
                if guard.record.is_empty() {
                    guard.retired = true;
                    false
                } else {
                    true
                }
            }
            Err(TryLockError::WouldBlock) | Err(TryLockError::Poisoned(_)) => true,
        });
        let after = self.slots.len();
        metrics::record_tracked_keys(self.name, after);
        before.saturating_sub(after)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn find_or_insert(&self, key: &K, now: Instant) -> Option<SharedSlot> {
        if let Some(slot) = self.slots.get(key) {
            return Some(Arc::clone(slot.value()));
        }

        if self.slots.len() >= self.max_keys {
            let removed = if self.claim_sweep(now) { self.sweep(now) } else { 0 };
            if self.slots.len() >= self.max_keys {
                tracing::warn!(
                    store = self.name,
                    tracked = self.slots.len(),
                    max_keys = self.max_keys,
                    "Key capacity reached, new key not tracked"
                );
                return None;
            }
            tracing::debug!(store = self.name, removed, "Swept stale keys");
        }

        let slot = self.slots.entry(key.clone()).or_default();
        Some(Arc::clone(slot.value()))
    }

    /// Whether an at-cap sweep may run now; records it if so.
    fn claim_sweep(&self, now: Instant) -> bool {
        let interval = self.window / SWEEP_DIVISOR;
        let mut last = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(at) if now.saturating_duration_since(at) < interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}
