//! The keyspace datastore: a single polymorphic key space backed by the
//! Adaptive Predictive Cache for eviction.
//!
//! Per §9's recommended strategy this holds one `HashMap<Key, Value>`
//! rather than three parallel string/list/hash maps, so type exclusivity
//! holds by construction instead of needing to be checked. Every public
//! method acquires the store's single lock for its full duration,
//! purges the target key if its TTL has elapsed, performs its work,
//! records an access on the APC, and (for mutations that can grow the key
//! set) runs capacity enforcement before releasing the lock.
//!
//! ## Architecture
//!
//! - [`Datastore`] is the public entry point; one instance is shared
//!   (via `Arc`) across every connection-handling worker.
//! - [`snapshot`] implements the textual dump/load format of §4.3.5.

pub mod snapshot;

use std::collections::{HashMap, VecDeque};

use keyspace_apc::AdaptivePredictiveCache;
use keyspace_domain::{Key, KeyspaceError, KeyspaceResult, Value, ValueKind};
use parking_lot::Mutex;

struct Inner {
    entries: HashMap<Key, Value>,
    apc: AdaptivePredictiveCache,
}

/// The shared, mutex-guarded key space.
pub struct Datastore {
    capacity: usize,
    inner: Mutex<Inner>,
}

fn wrong_type() -> KeyspaceError {
    KeyspaceError::Semantic("WRONGTYPE key holds the wrong kind of value".into())
}

fn no_such_key() -> KeyspaceError {
    KeyspaceError::Semantic("no such key".into())
}

fn out_of_range() -> KeyspaceError {
    KeyspaceError::Semantic("index out of range".into())
}

/// Resolve a possibly-negative list index (`-1` is the last element)
/// against a list of length `len`. Returns `None` if out of range.
fn resolve_index(len: i64, index: i64) -> Option<usize> {
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 || resolved >= len {
        None
    } else {
        Some(resolved as usize)
    }
}

impl Datastore {
    /// Build an empty store with the given `max_cache_size` capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                apc: AdaptivePredictiveCache::new(),
            }),
        }
    }

    /// Purge `key` if its TTL has elapsed. Returns `true` if it was removed.
    fn purge_if_expired(inner: &mut Inner, key: &Key) -> bool {
        if inner.apc.is_expired(key.as_bytes()) {
            inner.entries.remove(key);
            inner.apc.remove_key(key.as_bytes());
            true
        } else {
            false
        }
    }

    /// Evict keys until the distinct key count is back within capacity.
    fn check_and_evict(&self, inner: &mut Inner) {
        while inner.entries.len() > self.capacity {
            if let Some(victim) = inner.apc.evict_candidate() {
                let victim_key = Key::from(victim.clone());
                inner.entries.remove(&victim_key);
                inner.apc.remove_key(&victim);
                tracing::info!(key = %victim_key, "evicted key: over capacity");
            } else if let Some(fallback) = inner.entries.keys().next().cloned() {
                inner.entries.remove(&fallback);
                inner.apc.remove_key(fallback.as_bytes());
                tracing::info!(key = %fallback, "evicted key: no APC candidate, arbitrary fallback");
            } else {
                break;
            }
        }
    }

    // ---- string operations (§4.3.1) ----------------------------------

    /// `SET k v [ttl]`. `ttl == 0` clears any existing TTL on `k`.
    pub fn set(&self, key: Key, value: Vec<u8>, ttl_secs: u64) {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, &key);
        inner.entries.insert(key.clone(), Value::Str(value));
        inner.apc.record_access(key.as_bytes());
        inner.apc.set_ttl(key.as_bytes(), ttl_secs);
        self.check_and_evict(&mut inner);
    }

    /// `GET k`.
    pub fn get(&self, key: &Key) -> KeyspaceResult<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get(key) {
            Some(Value::Str(v)) => {
                let v = v.clone();
                inner.apc.record_access(key.as_bytes());
                Ok(Some(v))
            }
            Some(_) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    // ---- list operations (§4.3.2) -------------------------------------

    /// `LLEN k`; 0 if missing or expired.
    pub fn llen(&self, key: &Key) -> KeyspaceResult<i64> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get(key) {
            Some(Value::List(l)) => Ok(l.len() as i64),
            Some(_) => Err(wrong_type()),
            None => Ok(0),
        }
    }

    /// `LPUSH k v`. Returns the new length.
    pub fn lpush(&self, key: &Key, value: Vec<u8>) -> KeyspaceResult<i64> {
        self.push(key, value, true)
    }

    /// `RPUSH k v`. Returns the new length.
    pub fn rpush(&self, key: &Key, value: Vec<u8>) -> KeyspaceResult<i64> {
        self.push(key, value, false)
    }

    fn push(&self, key: &Key, value: Vec<u8>, front: bool) -> KeyspaceResult<i64> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        let len = {
            let entry = inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Value::List(VecDeque::new()));
            match entry {
                Value::List(list) => {
                    if front {
                        list.push_front(value);
                    } else {
                        list.push_back(value);
                    }
                    list.len() as i64
                }
                _ => return Err(wrong_type()),
            }
        };
        inner.apc.record_access(key.as_bytes());
        self.check_and_evict(&mut inner);
        Ok(len)
    }

    /// `LPOP k`.
    pub fn lpop(&self, key: &Key) -> KeyspaceResult<Option<Vec<u8>>> {
        self.pop(key, true)
    }

    /// `RPOP k`.
    pub fn rpop(&self, key: &Key) -> KeyspaceResult<Option<Vec<u8>>> {
        self.pop(key, false)
    }

    fn pop(&self, key: &Key, front: bool) -> KeyspaceResult<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        let popped = match inner.entries.get_mut(key) {
            Some(Value::List(list)) => {
                if front {
                    list.pop_front()
                } else {
                    list.pop_back()
                }
            }
            Some(_) => return Err(wrong_type()),
            None => return Ok(None),
        };
        inner.apc.record_access(key.as_bytes());
        if inner.entries.get(key).is_some_and(Value::is_empty_collection) {
            inner.entries.remove(key);
            inner.apc.remove_key(key.as_bytes());
        }
        Ok(popped)
    }

    /// `LREM k count v`. Returns the number of elements removed.
    pub fn lrem(&self, key: &Key, count: i64, value: &[u8]) -> KeyspaceResult<i64> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        let removed = match inner.entries.get_mut(key) {
            Some(Value::List(list)) => {
                let items: Vec<Vec<u8>> = list.drain(..).collect();
                let (kept, removed) = remove_matching(items, count, value);
                *list = kept.into();
                removed
            }
            Some(_) => return Err(wrong_type()),
            None => return Ok(0),
        };
        if removed > 0 {
            inner.apc.record_access(key.as_bytes());
        }
        if inner.entries.get(key).is_some_and(Value::is_empty_collection) {
            inner.entries.remove(key);
            inner.apc.remove_key(key.as_bytes());
        }
        Ok(removed)
    }

    /// `LINDEX k i`. Out-of-range resolves to `None`.
    pub fn lindex(&self, key: &Key, index: i64) -> KeyspaceResult<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get(key) {
            Some(Value::List(list)) => {
                let len = list.len() as i64;
                let result = resolve_index(len, index).map(|idx| list[idx].clone());
                inner.apc.record_access(key.as_bytes());
                Ok(result)
            }
            Some(_) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    /// `LSET k i v`. Out-of-range is an error.
    pub fn lset(&self, key: &Key, index: i64, value: Vec<u8>) -> KeyspaceResult<()> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get_mut(key) {
            Some(Value::List(list)) => {
                let len = list.len() as i64;
                let idx = resolve_index(len, index).ok_or_else(out_of_range)?;
                list[idx] = value;
            }
            Some(_) => return Err(wrong_type()),
            None => return Err(no_such_key()),
        }
        inner.apc.record_access(key.as_bytes());
        Ok(())
    }

    // ---- hash operations (§4.3.3) --------------------------------------

    /// `HSET k f v`. Returns 1 if the field was created, 0 if updated.
    pub fn hset(&self, key: &Key, field: Vec<u8>, value: Vec<u8>) -> KeyspaceResult<i64> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        let created = {
            let entry = inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Value::Hash(HashMap::new()));
            match entry {
                Value::Hash(h) => h.insert(field, value).is_none(),
                _ => return Err(wrong_type()),
            }
        };
        inner.apc.record_access(key.as_bytes());
        self.check_and_evict(&mut inner);
        Ok(if created { 1 } else { 0 })
    }

    /// `HMSET k [f v]+`.
    pub fn hmset(&self, key: &Key, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> KeyspaceResult<()> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        {
            let entry = inner
                .entries
                .entry(key.clone())
                .or_insert_with(|| Value::Hash(HashMap::new()));
            match entry {
                Value::Hash(h) => {
                    for (f, v) in pairs {
                        h.insert(f, v);
                    }
                }
                _ => return Err(wrong_type()),
            }
        }
        inner.apc.record_access(key.as_bytes());
        self.check_and_evict(&mut inner);
        Ok(())
    }

    /// `HGET k f`.
    pub fn hget(&self, key: &Key, field: &[u8]) -> KeyspaceResult<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get(key) {
            Some(Value::Hash(h)) => {
                let result = h.get(field).cloned();
                inner.apc.record_access(key.as_bytes());
                Ok(result)
            }
            Some(_) => Err(wrong_type()),
            None => Ok(None),
        }
    }

    /// `HEXISTS k f`.
    pub fn hexists(&self, key: &Key, field: &[u8]) -> KeyspaceResult<bool> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get(key) {
            Some(Value::Hash(h)) => {
                let result = h.contains_key(field);
                inner.apc.record_access(key.as_bytes());
                Ok(result)
            }
            Some(_) => Err(wrong_type()),
            None => Ok(false),
        }
    }

    /// `HDEL k f`. Empty hash collapses the key.
    pub fn hdel(&self, key: &Key, field: &[u8]) -> KeyspaceResult<i64> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        let removed = match inner.entries.get_mut(key) {
            Some(Value::Hash(h)) => h.remove(field).is_some(),
            Some(_) => return Err(wrong_type()),
            None => return Ok(0),
        };
        if removed {
            inner.apc.record_access(key.as_bytes());
        }
        if inner.entries.get(key).is_some_and(Value::is_empty_collection) {
            inner.entries.remove(key);
            inner.apc.remove_key(key.as_bytes());
        }
        Ok(if removed { 1 } else { 0 })
    }

    /// `HGETALL k`: alternating field/value pairs.
    pub fn hgetall(&self, key: &Key) -> KeyspaceResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get(key) {
            Some(Value::Hash(h)) => {
                let pairs = h.iter().map(|(f, v)| (f.clone(), v.clone())).collect();
                inner.apc.record_access(key.as_bytes());
                Ok(pairs)
            }
            Some(_) => Err(wrong_type()),
            None => Ok(Vec::new()),
        }
    }

    /// `HKEYS k`.
    pub fn hkeys(&self, key: &Key) -> KeyspaceResult<Vec<Vec<u8>>> {
        Ok(self.hgetall(key)?.into_iter().map(|(f, _)| f).collect())
    }

    /// `HVALS k`.
    pub fn hvals(&self, key: &Key) -> KeyspaceResult<Vec<Vec<u8>>> {
        Ok(self.hgetall(key)?.into_iter().map(|(_, v)| v).collect())
    }

    /// `HLEN k`.
    pub fn hlen(&self, key: &Key) -> KeyspaceResult<i64> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get(key) {
            Some(Value::Hash(h)) => Ok(h.len() as i64),
            Some(_) => Err(wrong_type()),
            None => Ok(0),
        }
    }

    // ---- meta-key operations (§4.3.4) ----------------------------------

    /// `DEL k` / `UNLINK k`. Returns 1 if the key was removed.
    pub fn del(&self, key: &Key) -> i64 {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        let had_entry = inner.entries.remove(key).is_some();
        let had_stats = inner.apc.contains(key.as_bytes());
        inner.apc.remove_key(key.as_bytes());
        if had_entry || had_stats {
            1
        } else {
            0
        }
    }

    /// `TYPE k`.
    pub fn type_of(&self, key: &Key) -> ValueKindOrNone {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        match inner.entries.get(key) {
            Some(v) => {
                let kind = v.kind();
                inner.apc.record_access(key.as_bytes());
                ValueKindOrNone::Kind(kind)
            }
            None => ValueKindOrNone::None,
        }
    }

    /// `EXPIRE k sec`. `sec == 0` deletes the key immediately.
    pub fn expire(&self, key: &Key, secs: u64) -> KeyspaceResult<()> {
        let mut inner = self.inner.lock();
        Self::purge_if_expired(&mut inner, key);
        let exists = inner.entries.contains_key(key) || inner.apc.contains(key.as_bytes());
        if !exists {
            return Err(no_such_key());
        }
        if secs == 0 {
            inner.entries.remove(key);
            inner.apc.remove_key(key.as_bytes());
        } else {
            inner.apc.set_ttl(key.as_bytes(), secs);
            inner.apc.record_access(key.as_bytes());
        }
        Ok(())
    }

    /// `RENAME old new`.
    pub fn rename(&self, old: &Key, new: &Key) -> KeyspaceResult<()> {
        let mut inner = self.inner.lock();
        if Self::purge_if_expired(&mut inner, old) {
            return Err(no_such_key());
        }
        let value = inner.entries.remove(old).ok_or_else(no_such_key)?;
        inner.entries.remove(new);
        inner.apc.remove_key(new.as_bytes());
        inner.entries.insert(new.clone(), value);
        inner.apc.rename(old.as_bytes(), new.as_bytes());
        Ok(())
    }

    /// `KEYS`: every non-expired key. Walking a key via `KEYS` counts as a
    /// touch on it, matching the original implementation's behavior.
    pub fn keys(&self) -> Vec<Key> {
        let mut inner = self.inner.lock();
        let candidates: Vec<Key> = inner.entries.keys().cloned().collect();
        let mut live = Vec::with_capacity(candidates.len());
        for key in candidates {
            if Self::purge_if_expired(&mut inner, &key) {
                continue;
            }
            inner.apc.record_access(key.as_bytes());
            live.push(key);
        }
        live
    }

    /// `FLUSHALL`.
    pub fn flushall(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.apc.clear();
    }

    /// Number of distinct live keys currently held (used by capacity tests).
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Write every live key to `path` in the textual snapshot format
    /// (§4.3.5). A straight open-truncate-write; atomicity is not required
    /// of this core.
    pub fn dump(&self, path: &std::path::Path) -> KeyspaceResult<()> {
        let mut buf = Vec::new();
        {
            let mut inner = self.inner.lock();
            let keys: Vec<Key> = inner.entries.keys().cloned().collect();
            for key in keys {
                if Self::purge_if_expired(&mut inner, &key) {
                    continue;
                }
                if let Some(value) = inner.entries.get(&key) {
                    snapshot::encode_entry(&mut buf, &key, value);
                }
            }
        }
        std::fs::write(path, buf)
            .map_err(|e| KeyspaceError::Snapshot(format!("writing {}: {e}", path.display())))
    }

    /// Replace the store's contents with the records in `path`. Clears all
    /// stores and the APC first. TTLs and APC metadata are not persisted:
    /// every loaded key starts fresh with no TTL.
    pub fn load(&self, path: &std::path::Path) -> KeyspaceResult<()> {
        let bytes = std::fs::read(path)
            .map_err(|e| KeyspaceError::Snapshot(format!("reading {}: {e}", path.display())))?;
        let records = snapshot::decode(&bytes)?;

        self.flushall();
        for record in records {
            match record {
                snapshot::Record::Str(key, value) => {
                    self.set(Key::from(key), value, 0);
                }
                snapshot::Record::List(key, items) => {
                    let key = Key::from(key);
                    for item in items {
                        self.rpush(&key, item)?;
                    }
                }
                snapshot::Record::Hash(key, pairs) => {
                    let key = Key::from(key);
                    if !pairs.is_empty() {
                        self.hmset(&key, pairs)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// The result of a `TYPE` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKindOrNone {
    /// The key is live and holds a value of this kind.
    Kind(ValueKind),
    /// The key does not exist (or was just expired).
    None,
}

impl ValueKindOrNone {
    /// The wire name `TYPE` reports: `"string"`, `"list"`, `"hash"`, or
    /// `"none"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKindOrNone::Kind(k) => k.as_str(),
            ValueKindOrNone::None => "none",
        }
    }
}

/// Apply `LREM`'s removal rule to a flat list of items, returning the
/// surviving items in original order and the count removed.
fn remove_matching(items: Vec<Vec<u8>>, count: i64, value: &[u8]) -> (Vec<Vec<u8>>, i64) {
    if count >= 0 {
        let mut limit = if count == 0 { i64::MAX } else { count };
        let mut removed = 0i64;
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if limit > 0 && item == value {
                removed += 1;
                limit -= 1;
            } else {
                kept.push(item);
            }
        }
        (kept, removed)
    } else {
        let mut limit = -count;
        let mut removed = 0i64;
        let mut kept_rev = Vec::with_capacity(items.len());
        for item in items.into_iter().rev() {
            if limit > 0 && item == value {
                removed += 1;
                limit -= 1;
            } else {
                kept_rev.push(item);
            }
        }
        kept_rev.reverse();
        (kept_rev, removed)
    }
}
