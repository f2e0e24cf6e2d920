//! Adaptive Predictive Cache: the eviction policy engine for the keyspace
//! store.
//!
//! The APC owns no value data, only a per-key access history. It scores
//! every key on a blend of recency, frequency, and remaining TTL, and is
//! consulted whenever the store needs to shed a key to stay under its
//! configured capacity.
//!
//! ## Architecture
//!
//! [`AdaptivePredictiveCache`] keeps one [`KeyStats`] record per live key,
//! keyed by raw bytes so it never needs to know about [`Key`](keyspace_domain::Key)'s
//! ownership story. All timestamps are [`Instant`]s, so the score is
//! independent of wall-clock adjustments.
//!
//! ## Example
//!
//! ```
//! use keyspace_apc::AdaptivePredictiveCache;
//!
//! let mut apc = AdaptivePredictiveCache::new();
//! apc.record_access(b"session:42");
//! apc.set_ttl(b"session:42", 30);
//! assert!(apc.contains(b"session:42"));
//! ```

use std::collections::HashMap;
use std::time::Instant;

/// Weight given to recency in the score formula.
const ALPHA: f64 = 0.5;
/// Weight given to access frequency in the score formula.
const BETA: f64 = 0.3;
/// Weight given to remaining TTL fraction in the score formula.
const GAMMA: f64 = 0.2;

/// Per-key access history the APC uses to compute eviction scores.
#[derive(Debug, Clone)]
pub struct KeyStats {
    access_count: u64,
    last_access: Instant,
    ttl_initial_seconds: u64,
    ttl_set_time: Instant,
    score: f64,
}

impl KeyStats {
    fn new(now: Instant) -> Self {
        Self {
            access_count: 0,
            last_access: now,
            ttl_initial_seconds: 0,
            ttl_set_time: now,
            score: 0.0,
        }
    }

    /// Number of recorded accesses.
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// The TTL duration, in seconds, set at the moment `set_ttl` was last
    /// called. Zero means no TTL is active.
    pub fn ttl_initial_seconds(&self) -> u64 {
        self.ttl_initial_seconds
    }

    /// The cached score as of the last recomputation.
    pub fn score(&self) -> f64 {
        self.score
    }

    fn remaining_ttl(&self, now: Instant) -> u64 {
        if self.ttl_initial_seconds == 0 {
            return 0;
        }
        let elapsed = now.saturating_duration_since(self.ttl_set_time).as_secs();
        self.ttl_initial_seconds.saturating_sub(elapsed)
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.ttl_initial_seconds > 0 && self.remaining_ttl(now) == 0
    }

    fn recompute_score(&mut self, now: Instant) {
        if self.is_expired(now) {
            self.score = f64::NEG_INFINITY;
            return;
        }
        let secs_since_access = now.saturating_duration_since(self.last_access).as_secs_f64();
        let recency = 1.0 / (1.0 + secs_since_access);
        let frequency = ((1.0 + self.access_count as f64)).ln();
        let ttl_factor = if self.ttl_initial_seconds == 0 {
            0.0
        } else {
            self.remaining_ttl(now) as f64 / self.ttl_initial_seconds as f64
        };
        self.score = ALPHA * recency + BETA * frequency + GAMMA * ttl_factor;
    }
}

/// The eviction-candidate scoring engine.
///
/// Every method takes the key as `&[u8]` rather than [`Key`](keyspace_domain::Key)
/// so callers can pass borrowed bytes without allocating a key just to look
/// one up.
#[derive(Debug, Default)]
pub struct AdaptivePredictiveCache {
    stats: HashMap<Vec<u8>, KeyStats>,
}

impl AdaptivePredictiveCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            stats: HashMap::new(),
        }
    }

    /// Record a touch on `key`: creates its stats record if absent,
    /// increments `access_count`, advances `last_access` to now, and
    /// recomputes the score.
    pub fn record_access(&mut self, key: &[u8]) {
        let now = Instant::now();
        let entry = self
            .stats
            .entry(key.to_vec())
            .or_insert_with(|| KeyStats::new(now));
        entry.access_count += 1;
        entry.last_access = now;
        entry.recompute_score(now);
    }

    /// Set (or clear, with `seconds == 0`) the TTL on `key`. Creates the
    /// stats record if absent.
    pub fn set_ttl(&mut self, key: &[u8], seconds: u64) {
        let now = Instant::now();
        let entry = self
            .stats
            .entry(key.to_vec())
            .or_insert_with(|| KeyStats::new(now));
        entry.ttl_initial_seconds = seconds;
        entry.ttl_set_time = now;
        entry.last_access = now;
        entry.recompute_score(now);
    }

    /// Seconds remaining on `key`'s TTL; 0 if the key is unknown or has no
    /// TTL.
    pub fn ttl_remaining(&self, key: &[u8]) -> u64 {
        self.stats
            .get(key)
            .map(|s| s.remaining_ttl(Instant::now()))
            .unwrap_or(0)
    }

    /// True if `key`'s TTL (if any) has elapsed.
    pub fn is_expired(&self, key: &[u8]) -> bool {
        self.stats
            .get(key)
            .map(|s| s.is_expired(Instant::now()))
            .unwrap_or(false)
    }

    /// Recompute `key`'s cached score against the current time.
    pub fn update_score(&mut self, key: &[u8]) {
        let now = Instant::now();
        if let Some(stats) = self.stats.get_mut(key) {
            stats.recompute_score(now);
        }
    }

    /// The cached score for `key`, if it has a stats record.
    pub fn score(&self, key: &[u8]) -> Option<f64> {
        self.stats.get(key).map(|s| s.score)
    }

    /// Pick the best eviction candidate: any TTL-expired key takes priority;
    /// otherwise the key with the minimum score. Returns `None` if the
    /// cache tracks no keys.
    pub fn evict_candidate(&mut self) -> Option<Vec<u8>> {
        let now = Instant::now();
        for stats in self.stats.values_mut() {
            stats.recompute_score(now);
        }

        if let Some((key, _)) = self
            .stats
            .iter()
            .find(|(_, stats)| stats.is_expired(now))
        {
            return Some(key.clone());
        }

        self.stats
            .iter()
            .min_by(|(_, a), (_, b)| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(key, _)| key.clone())
    }

    /// Drop `key`'s stats record.
    pub fn remove_key(&mut self, key: &[u8]) {
        self.stats.remove(key);
    }

    /// Transfer `old`'s stats record to `new`, then record one additional
    /// access on `new` (matching `RENAME`'s semantics: the destination
    /// inherits history and is itself touched by the rename). A no-op if
    /// `old` has no stats record.
    pub fn rename(&mut self, old: &[u8], new: &[u8]) {
        if let Some(stats) = self.stats.remove(old) {
            self.stats.insert(new.to_vec(), stats);
        }
        self.record_access(new);
    }

    /// True if `key` has a stats record.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.stats.contains_key(key)
    }

    /// Number of keys the cache is currently tracking.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// True if the cache tracks no keys.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Drop every stats record.
    pub fn clear(&mut self) {
        self.stats.clear();
    }
}
