// src/core/storage/lock.rs

//! The multi-key lock manager: a fixed power-of-two array of per-slot R/W
//! locks, with deadlock-free multi-key acquisition via a total order over
//! slot indices. Ported from the original `datastruct/lock` package's
//! `fnv32`/`spread`/`toLockIndices` scheme; the ascending-acquire,
//! dedupe-by-slot structuring follows the later Rust rewrite's
//! `BTreeSet`-then-`BTreeMap` idiom for multi-shard locking.

use super::fnv::fnv1a32;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::BTreeSet;

pub struct LockManager {
    table: Vec<RwLock<()>>,
}

impl LockManager {
    /// `size` must be a power of two.
    pub fn new(size: usize) -> Self {
        assert!(size.is_power_of_two(), "lock table size must be a power of two");
        let table = (0..size).map(|_| RwLock::new(())).collect();
        Self { table }
    }

    pub fn slot(&self, key: &[u8]) -> usize {
        (fnv1a32(key) as usize) & (self.table.len() - 1)
    }

    fn dedup_slots<'a, I: IntoIterator<Item = &'a [u8]>>(&self, keys: I) -> BTreeSet<usize> {
        keys.into_iter().map(|k| self.slot(k)).collect()
    }

    pub fn lock(&self, key: &[u8]) -> RwLockWriteGuard<'_, ()> {
        self.table[self.slot(key)].write()
    }

    pub fn rlock(&self, key: &[u8]) -> RwLockReadGuard<'_, ()> {
        self.table[self.slot(key)].read()
    }

    /// Acquires write locks for every distinct slot touched by `keys`, in
    /// strictly ascending slot order, so that any two overlapping multi-key
    /// acquisitions cannot deadlock.
    pub fn locks<'a, I: IntoIterator<Item = &'a [u8]>>(&self, keys: I) -> MultiGuard<'_> {
        let slots = self.dedup_slots(keys);
        let guards = slots.into_iter().map(|i| self.table[i].write()).collect();
        MultiGuard::Write(guards)
    }

    pub fn rlocks<'a, I: IntoIterator<Item = &'a [u8]>>(&self, keys: I) -> MultiGuard<'_> {
        let slots = self.dedup_slots(keys);
        let guards = slots.into_iter().map(|i| self.table[i].read()).collect();
        MultiGuard::Read(guards)
    }

    /// Locks every slot in the table, in ascending order. Used by `KEYS`,
    /// `FLUSHDB`, and other whole-keyspace operations.
    pub fn lock_all(&self) -> MultiGuard<'_> {
        let guards = self.table.iter().map(|l| l.write()).collect();
        MultiGuard::Write(guards)
    }
}

/// Holds the guards acquired by a multi-key lock call for as long as the
/// caller needs exclusive or shared access. Dropping it releases every slot;
/// release order is irrelevant since locks are per-slot and non-reentrant.
pub enum MultiGuard<'a> {
    Write(Vec<RwLockWriteGuard<'a, ()>>),
    Read(Vec<RwLockReadGuard<'a, ()>>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn multi_key_acquisition_is_deadlock_free() {
        let manager = Arc::new(LockManager::new(16));
        let keys: Vec<Vec<u8>> = (0..8).map(|i| vec![b'k', i as u8]).collect();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = manager.clone();
            let mut shuffled = keys.clone();
            // Cheap deterministic shuffle: rotate by thread index.
            let rotate_by = shuffled.len() / 2;
            shuffled.rotate_left(rotate_by);
            handles.push(thread::spawn(move || {
                let refs: Vec<&[u8]> = shuffled.iter().map(|k| k.as_slice()).collect();
                let _guard = manager.locks(refs);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn same_key_same_slot() {
        let manager = LockManager::new(16);
        assert_eq!(manager.slot(b"foo"), manager.slot(b"foo"));
    }
}
