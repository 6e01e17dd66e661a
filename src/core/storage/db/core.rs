// src/core/storage/db/core.rs

//! The sharded dictionary (component A): `S` shards, each independently
//! locked, with FNV-1a hashing choosing the shard so that the shard index
//! and the lock manager's slot index can share the exact same hash function
//! (the multi-key lock manager and the dictionary must agree on which keys
//! collide). Keys are lazily expired on every lookup; a background sweeper
//! (see `core::state::ttl`) additionally scans for and removes expired keys
//! that are never looked up again.

use super::shard::DbShard;
use crate::core::storage::data_types::StoredValue;
use crate::core::storage::fnv::fnv1a32;
use crate::core::storage::lock::LockManager;
use bytes::Bytes;
use rand::seq::IteratorRandom;

const DEFAULT_SHARDS: usize = 16;

pub struct Db {
    shards: Vec<DbShard>,
    mask: usize,
    pub locks: LockManager,
}

impl Db {
    pub fn new() -> Self {
        Self::with_shard_count(DEFAULT_SHARDS)
    }

    pub fn with_shard_count(count: usize) -> Self {
        assert!(count.is_power_of_two(), "shard count must be a power of two");
        let shards = (0..count).map(|_| DbShard::new()).collect();
        Self {
            shards,
            mask: count - 1,
            locks: LockManager::new(count.max(16)),
        }
    }

    fn shard_index(&self, key: &[u8]) -> usize {
        (fnv1a32(key) as usize) & self.mask
    }

    fn shard(&self, key: &[u8]) -> &DbShard {
        &self.shards[self.shard_index(key)]
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes `key` if it has expired as of `now_ms`. Returns true if a
    /// removal happened. Used both standalone (the TTL sweeper) and as the
    /// first step of every `with_read`/`with_write`.
    pub fn expire_if_needed(&self, key: &[u8], now_ms: u64) -> bool {
        let _guard = self.locks.lock(key);
        self.expire_if_needed_locked(key, now_ms)
    }

    /// Same as `expire_if_needed`, for a caller that already holds the lock
    /// manager's guard for `key`.
    fn expire_if_needed_locked(&self, key: &[u8], now_ms: u64) -> bool {
        let shard = self.shard(key);
        let expired = {
            let guard = shard.entries.read();
            guard.get(key).is_some_and(|v| v.is_expired_at(now_ms))
        };
        if expired {
            shard.remove(key);
        }
        expired
    }

    /// Acquires the lock manager's slot for `key` (the same slot a multi-key
    /// caller would acquire via `self.locks.locks(..)`) before touching the
    /// shard, so single-key and multi-key access go through the same
    /// mutual-exclusion mechanism. The shard count is always sized so its
    /// mask matches the lock table's mask (see `with_shard_count`), which is
    /// what makes `shard_index(key) == locks.slot(key)` for every key.
    pub fn with_read<F, R>(&self, key: &[u8], now_ms: u64, f: F) -> R
    where
        F: FnOnce(Option<&StoredValue>) -> R,
    {
        let _guard = self.locks.rlock(key);
        self.with_read_locked(key, now_ms, f)
    }

    /// Same as `with_read`, for a caller that already holds the lock
    /// manager's guard for `key` (e.g. a multi-key command holding a
    /// `MultiGuard` from `self.locks.locks(..)`). Acquiring it again on the
    /// same thread would deadlock.
    pub fn with_read_locked<F, R>(&self, key: &[u8], now_ms: u64, f: F) -> R
    where
        F: FnOnce(Option<&StoredValue>) -> R,
    {
        self.expire_if_needed_locked(key, now_ms);
        let guard = self.shard(key).entries.read();
        f(guard.get(key))
    }

    pub fn with_write<F, R>(&self, key: &[u8], now_ms: u64, f: F) -> R
    where
        F: FnOnce(&mut std::collections::HashMap<Bytes, StoredValue>) -> R,
    {
        let _guard = self.locks.lock(key);
        self.with_write_locked(key, now_ms, f)
    }

    /// Same as `with_write`, for a caller that already holds the lock
    /// manager's guard for `key`.
    pub fn with_write_locked<F, R>(&self, key: &[u8], now_ms: u64, f: F) -> R
    where
        F: FnOnce(&mut std::collections::HashMap<Bytes, StoredValue>) -> R,
    {
        self.expire_if_needed_locked(key, now_ms);
        let mut guard = self.shard(key).entries.write();
        f(&mut guard)
    }

    pub fn insert(&self, key: Bytes, value: StoredValue) -> Option<StoredValue> {
        let _guard = self.locks.lock(&key);
        self.insert_locked(key, value)
    }

    /// Same as `insert`, for a caller that already holds the lock manager's
    /// guard for `key` (e.g. `RENAME`, which locks both its keys up front).
    pub fn insert_locked(&self, key: Bytes, value: StoredValue) -> Option<StoredValue> {
        self.shard(&key).insert(key, value)
    }

    pub fn remove(&self, key: &[u8]) -> Option<StoredValue> {
        let _guard = self.locks.lock(key);
        self.remove_locked(key)
    }

    /// Same as `remove`, for a caller that already holds the lock manager's
    /// guard for `key`.
    pub fn remove_locked(&self, key: &[u8]) -> Option<StoredValue> {
        self.shard(key).remove(key)
    }

    pub fn contains(&self, key: &[u8], now_ms: u64) -> bool {
        self.with_read(key, now_ms, |v| v.is_some())
    }

    /// Same as `contains`, for a caller that already holds the lock
    /// manager's guard for `key`.
    pub fn contains_locked(&self, key: &[u8], now_ms: u64) -> bool {
        self.with_read_locked(key, now_ms, |v| v.is_some())
    }

    /// Inserts `value` under `key` only if it's currently absent, returning
    /// whether the insert happened. Atomic under the key's own lock slot.
    pub fn put_if_absent(&self, key: Bytes, value: StoredValue, now_ms: u64) -> bool {
        let _guard = self.locks.lock(&key);
        self.expire_if_needed_locked(&key, now_ms);
        let mut guard = self.shard(&key).entries.write();
        if guard.contains_key(key.as_ref()) {
            false
        } else {
            drop(guard);
            self.shard(&key).insert(key, value);
            true
        }
    }

    /// Replaces the value stored under `key` only if it's currently present,
    /// returning whether the replace happened. Atomic under the key's own
    /// lock slot.
    pub fn put_if_exists(&self, key: &[u8], value: StoredValue, now_ms: u64) -> bool {
        let _guard = self.locks.lock(key);
        self.expire_if_needed_locked(key, now_ms);
        let mut guard = self.shard(key).entries.write();
        if let Some(slot) = guard.get_mut(key) {
            *slot = value;
            true
        } else {
            false
        }
    }

    /// Calls `f` with every live (key, value) pair, shard by shard. Each
    /// shard is visited under its own read lock, so `f` never sees two
    /// shards' entries interleaved under the same lock, but the dictionary
    /// as a whole is not snapshotted atomically across shards.
    pub fn for_each<F>(&self, now_ms: u64, mut f: F)
    where
        F: FnMut(&Bytes, &StoredValue),
    {
        for shard in &self.shards {
            let guard = shard.entries.read();
            for (k, v) in guard.iter() {
                if !v.is_expired_at(now_ms) {
                    f(k, v);
                }
            }
        }
    }

    pub fn clear(&self) {
        let _guard = self.locks.lock_all();
        for shard in &self.shards {
            shard.clear();
        }
    }

    /// All live keys, skipping (but not removing) lazily-expired ones. Used
    /// by `KEYS`; callers that need exact lazy expiry should call
    /// `expire_if_needed` themselves during iteration.
    pub fn keys(&self, now_ms: u64) -> Vec<Bytes> {
        let mut out = Vec::new();
        for shard in &self.shards {
            let guard = shard.entries.read();
            out.extend(
                guard
                    .iter()
                    .filter(|(_, v)| !v.is_expired_at(now_ms))
                    .map(|(k, _)| k.clone()),
            );
        }
        out
    }

    pub fn random_key(&self, now_ms: u64) -> Option<Bytes> {
        let mut rng = rand::thread_rng();
        let non_empty: Vec<&DbShard> = self.shards.iter().filter(|s| s.len() > 0).collect();
        let shard = non_empty.into_iter().choose(&mut rng)?;
        let guard = shard.entries.read();
        guard
            .iter()
            .filter(|(_, v)| !v.is_expired_at(now_ms))
            .choose(&mut rng)
            .map(|(k, _)| k.clone())
    }

    /// `n` keys drawn independently (with replacement across draws, so the
    /// same key can appear more than once), or fewer than `n` if the
    /// dictionary doesn't hold enough live keys.
    pub fn random_keys(&self, n: usize, now_ms: u64) -> Vec<Bytes> {
        (0..n).filter_map(|_| self.random_key(now_ms)).collect()
    }

    /// Up to `n` distinct keys, drawn without replacement. Returns fewer
    /// than `n` (down to empty) once the dictionary's live keys are
    /// exhausted, rather than looping or repeating.
    pub fn random_distinct_keys(&self, n: usize, now_ms: u64) -> Vec<Bytes> {
        let all = self.keys(now_ms);
        let mut rng = rand::thread_rng();
        all.into_iter().choose_multiple(&mut rng, n)
    }

    pub fn expire(&self, key: &[u8], now_ms: u64, expires_at_ms: u64) -> bool {
        self.with_write(key, now_ms, |map| {
            if let Some(v) = map.get_mut(key) {
                v.expires_at_ms = Some(expires_at_ms);
                true
            } else {
                false
            }
        })
    }

    pub fn persist(&self, key: &[u8], now_ms: u64) -> bool {
        self.with_write(key, now_ms, |map| {
            if let Some(v) = map.get_mut(key) {
                let had = v.expires_at_ms.is_some();
                v.expires_at_ms = None;
                had
            } else {
                false
            }
        })
    }

    pub fn ttl_ms(&self, key: &[u8], now_ms: u64) -> Option<Option<u64>> {
        self.with_read(key, now_ms, |v| v.map(|v| v.expires_at_ms.map(|t| t.saturating_sub(now_ms))))
    }

    /// A representative sample of keys for the TTL sweeper, drawn from the
    /// shard whose turn it is this sweep tick.
    pub fn sample_shard_for_ttl(&self, shard_index: usize, sample_size: usize) -> Vec<(Bytes, Option<u64>)> {
        let shard = &self.shards[shard_index & self.mask];
        let guard = shard.entries.read();
        let mut rng = rand::thread_rng();
        guard
            .iter()
            .choose_multiple(&mut rng, sample_size)
            .into_iter()
            .map(|(k, v)| (k.clone(), v.expires_at_ms))
            .collect()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::data_types::{StoredValue, Value};

    #[test]
    fn insert_get_remove_roundtrip() {
        let db = Db::new();
        db.insert(Bytes::from_static(b"a"), StoredValue::new(Value::String(Bytes::from_static(b"1"))));
        assert!(db.contains(b"a", 0));
        assert_eq!(db.len(), 1);
        assert!(db.remove(b"a").is_some());
        assert!(!db.contains(b"a", 0));
    }

    #[test]
    fn lazy_expiry_removes_on_read() {
        let db = Db::new();
        db.insert(
            Bytes::from_static(b"a"),
            StoredValue::with_expiry(Value::String(Bytes::from_static(b"1")), 100),
        );
        assert!(db.contains(b"a", 50));
        assert!(!db.contains(b"a", 200));
        assert_eq!(db.len(), 0);
    }

    #[test]
    fn same_key_maps_to_same_shard_as_lock_slot() {
        let db = Db::new();
        let idx = db.shard_index(b"foo");
        assert_eq!(idx, db.shard_index(b"foo"));
    }
}
