// src/core/storage/zset/mod.rs

//! `SortedSet`: a member->score map paired with a skip list, so lookups by
//! member are O(1) while rank and range queries stay O(log N). Whenever a
//! member's score changes, the old `(member, score)` pair must be removed
//! from the skip list before the new one is inserted — the two structures
//! are kept in lockstep on every mutation.

mod skiplist;

pub use skiplist::{Entry, ScoreBound};

use bytes::Bytes;
use skiplist::SkipList;
use std::collections::HashMap;

#[derive(Default)]
pub struct SortedSet {
    scores: HashMap<Bytes, f64>,
    list: SkipList,
}

impl SortedSet {
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
            list: SkipList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Inserts or updates `member`'s score. Returns `true` if the member was
    /// newly added (not previously present).
    pub fn insert(&mut self, member: Bytes, score: f64) -> bool {
        match self.scores.get(&member).copied() {
            Some(old) if old == score => false,
            Some(old) => {
                self.list.remove(&member, old);
                self.list.insert(member.clone(), score);
                self.scores.insert(member, score);
                false
            }
            None => {
                self.list.insert(member.clone(), score);
                self.scores.insert(member, score);
                true
            }
        }
    }

    /// Adds `delta` to `member`'s current score (defaulting to 0), returning
    /// the new score.
    pub fn increment(&mut self, member: Bytes, delta: f64) -> f64 {
        let new_score = self.score(&member).unwrap_or(0.0) + delta;
        self.insert(member, new_score);
        new_score
    }

    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.list.remove(&Bytes::copy_from_slice(member), score);
                true
            }
            None => false,
        }
    }

    pub fn rank(&self, member: &[u8]) -> Option<i64> {
        let score = self.score(member)?;
        let r = self.list.get_rank(&Bytes::copy_from_slice(member), score);
        if r == 0 { None } else { Some(r - 1) }
    }

    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<Entry> {
        self.list.range_by_rank(start, stop)
    }

    pub fn range_by_score(&self, min: ScoreBound, max: ScoreBound) -> Vec<Entry> {
        self.list.range_by_score(min, max)
    }

    pub fn remove_range_by_rank(&mut self, start: i64, stop: i64) -> Vec<Entry> {
        let removed = self.list.remove_range_by_rank(start, stop);
        for e in &removed {
            self.scores.remove(&e.member);
        }
        removed
    }

    pub fn remove_range_by_score(&mut self, min: ScoreBound, max: ScoreBound) -> Vec<Entry> {
        let removed = self.list.remove_range_by_score(min, max);
        for e in &removed {
            self.scores.remove(&e.member);
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &f64)> {
        self.scores.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_update_and_consistency() {
        let mut z = SortedSet::new();
        assert!(z.insert(Bytes::from_static(b"a"), 1.0));
        assert!(!z.insert(Bytes::from_static(b"a"), 2.0));
        assert_eq!(z.score(b"a"), Some(2.0));
        assert_eq!(z.len(), 1);
    }

    #[test]
    fn rank_matches_insertion_order_by_score() {
        let mut z = SortedSet::new();
        z.insert(Bytes::from_static(b"a"), 3.0);
        z.insert(Bytes::from_static(b"b"), 1.0);
        z.insert(Bytes::from_static(b"c"), 2.0);
        assert_eq!(z.rank(b"b"), Some(0));
        assert_eq!(z.rank(b"c"), Some(1));
        assert_eq!(z.rank(b"a"), Some(2));
    }

    #[test]
    fn remove_drops_from_both_structures() {
        let mut z = SortedSet::new();
        z.insert(Bytes::from_static(b"a"), 1.0);
        assert!(z.remove(b"a"));
        assert!(!z.remove(b"a"));
        assert_eq!(z.len(), 0);
        assert!(z.range_by_rank(0, -1).is_empty());
    }

    #[test]
    fn increment_accumulates() {
        let mut z = SortedSet::new();
        assert_eq!(z.increment(Bytes::from_static(b"a"), 1.5), 1.5);
        assert_eq!(z.increment(Bytes::from_static(b"a"), 1.5), 3.0);
    }
}
