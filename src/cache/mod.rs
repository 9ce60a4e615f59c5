//! In-memory result cache with TTL expiry.
//!
//! Entries are keyed by search [`Fingerprint`]. Expired entries are invisible
//! to lookups right away and are removed either lazily on lookup or by the
//! single background expiry task the cache owns.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::{Fingerprint, ScoredJobRecord};

/// One cached result set.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub results: Arc<Vec<ScoredJobRecord>>,
    /// Monotonic insertion time, used for expiry.
    pub created_at: Instant,
    /// Wall-clock insertion time, reported to callers.
    pub inserted_at: DateTime<Utc>,
    /// Distinguishes this entry from a later replacement under the same key.
    pub generation: u64,
}

impl CacheEntry {
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub expired: u64,
    pub invalidated: u64,
}

/// Stale heap items tolerated before a full compaction.
const COMPACT_SLACK: usize = 16;

#[derive(Default)]
struct CacheState {
    entries: HashMap<Fingerprint, CacheEntry>,
    deadlines: BinaryHeap<Reverse<(Instant, u64, Fingerprint)>>,
    next_generation: u64,
    stats: CacheStats,
}

struct CacheInner {
    ttl: Duration,
    state: Mutex<CacheState>,
    wake: Notify,
}

impl CacheState {
    fn is_current(&self, fingerprint: &Fingerprint, generation: u64) -> bool {
        self.entries
            .get(fingerprint)
            .is_some_and(|entry| entry.generation == generation)
    }

    /// Remove entries whose deadline has passed and drop heap items that no
    /// longer point at a stored entry. Keeps the heap within a small multiple
    /// of the entry count whether or not the expiry task runs.
    fn prune(&mut self, now: Instant) {
        while let Some(Reverse((deadline, generation, fingerprint))) = self.deadlines.peek() {
            let current = self.is_current(fingerprint, *generation);
            if current && *deadline > now {
                break;
            }
            let Some(Reverse((_, _, fingerprint))) = self.deadlines.pop() else {
                break;
            };
            if current {
                self.entries.remove(&fingerprint);
                self.stats.expired += 1;
                debug!(target: "cache", fingerprint = fingerprint.short(), "entry expired");
            }
        }

        if self.deadlines.len() > self.entries.len() * 2 + COMPACT_SLACK {
            let entries = &self.entries;
            self.deadlines.retain(|Reverse((_, generation, fingerprint))| {
                entries
                    .get(fingerprint)
                    .is_some_and(|entry| entry.generation == *generation)
            });
        }
    }
}

impl CacheInner {
    fn expire_due(&self) {
        self.state.lock().prune(Instant::now());
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.state
            .lock()
            .deadlines
            .peek()
            .map(|Reverse((deadline, _, _))| *deadline)
    }
}

async fn run_expiry(inner: Arc<CacheInner>) {
    loop {
        match inner.next_deadline() {
            Some(deadline) => {
                tokio::select! {
                    () = tokio::time::sleep_until(deadline) => inner.expire_due(),
                    () = inner.wake.notified() => {}
                }
            }
            None => inner.wake.notified().await,
        }
    }
}

/// Shared, synchronized result cache.
pub struct ResultCache {
    inner: Arc<CacheInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ResultCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                ttl,
                state: Mutex::new(CacheState::default()),
                wake: Notify::new(),
            }),
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Spawn the background expiry task on the current runtime.
    ///
    /// Idempotent. Returns false when called outside a tokio runtime; lazy
    /// expiry on lookup still applies then.
    pub fn start_expiry_task(&self) -> bool {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return true;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(target: "cache", "no runtime; expiry task not started");
            return false;
        };
        *task = Some(runtime.spawn(run_expiry(Arc::clone(&self.inner))));
        info!(target: "cache", ttl_secs = self.inner.ttl.as_secs(), "expiry task started");
        true
    }

    /// Stop the background expiry task.
    pub fn shutdown(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            info!(target: "cache", "expiry task stopped");
        }
    }

    /// Live entry for `fingerprint`, if any.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let mut state = self.inner.state.lock();
        state.prune(Instant::now());
        let Some(entry) = state.entries.get(fingerprint).cloned() else {
            state.stats.misses += 1;
            return None;
        };
        state.stats.hits += 1;
        Some(entry)
    }

    /// Store `results` under `fingerprint`, replacing any previous entry.
    pub fn put(&self, fingerprint: Fingerprint, results: Vec<ScoredJobRecord>) -> CacheEntry {
        let entry = {
            let mut state = self.inner.state.lock();
            state.prune(Instant::now());
            state.next_generation += 1;
            let entry = CacheEntry {
                fingerprint: fingerprint.clone(),
                results: Arc::new(results),
                created_at: Instant::now(),
                inserted_at: Utc::now(),
                generation: state.next_generation,
            };
            let deadline = entry.created_at + self.inner.ttl;
            state
                .deadlines
                .push(Reverse((deadline, entry.generation, fingerprint.clone())));
            state.entries.insert(fingerprint, entry.clone());
            state.stats.inserts += 1;
            entry
        };
        self.inner.wake.notify_one();
        debug!(
            target: "cache",
            fingerprint = entry.fingerprint.short(),
            results = entry.results.len(),
            "stored results"
        );
        entry
    }

    /// Drop the entry for `fingerprint`. Returns whether one existed.
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
        let mut state = self.inner.state.lock();
        let removed = state.entries.remove(fingerprint).is_some();
        if removed {
            state.stats.invalidated += 1;
        }
        state.prune(Instant::now());
        removed
    }

    /// Number of stored entries, including ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        state.entries.clear();
        state.deadlines.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.state.lock().stats
    }
}

impl Drop for ResultCache {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
