// src/core/storage/db/shard.rs

//! One shard of the keyspace: a plain hash map guarded by a single R/W lock.
//! Sharding exists so that unrelated keys never contend on the same lock;
//! each shard is small enough that its lock is held only briefly.

use crate::core::storage::data_types::StoredValue;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct DbShard {
    pub(super) entries: RwLock<HashMap<Bytes, StoredValue>>,
    len: AtomicUsize,
}

impl DbShard {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            len: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn insert(&self, key: Bytes, value: StoredValue) -> Option<StoredValue> {
        let mut guard = self.entries.write();
        let old = guard.insert(key, value);
        if old.is_none() {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
        old
    }

    pub fn remove(&self, key: &[u8]) -> Option<StoredValue> {
        let mut guard = self.entries.write();
        let removed = guard.remove(key);
        if removed.is_some() {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn clear(&self) {
        let mut guard = self.entries.write();
        guard.clear();
        self.len.store(0, Ordering::Relaxed);
    }
}
