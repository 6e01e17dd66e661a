// src/core/storage/zset/skiplist.rs

//! An ordered index over (score, member) pairs, with O(log N) rank and
//! range queries. Ported from the original `datastruct/sortedset/skiplist.go`
//! implementation: same level/span/backward-pointer algorithm, same
//! insert/remove splice math. Stored as an arena (`Vec<Node>` plus a free
//! list) rather than node-per-allocation pointers, per the "arena with
//! integer indices" option the design notes allow; this keeps the Rust port
//! free of unsafe code while preserving the exact iteration contract.

use bytes::Bytes;
use rand::Rng;

const MAX_LEVEL: usize = 16;
const P: u32 = (0.25 * (u32::MAX as f64)) as u32;

/// One endpoint of a score interval: one of {-inf, +inf, a numeric value}
/// with an exclusive flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    NegInf,
    PosInf,
    Value(f64, bool),
}

impl ScoreBound {
    /// True if this bound is greater than `value` (used as the upper bound
    /// check while walking forward).
    fn greater(&self, value: f64) -> bool {
        match self {
            ScoreBound::NegInf => false,
            ScoreBound::PosInf => true,
            ScoreBound::Value(v, exclude) => {
                if *exclude {
                    *v > value
                } else {
                    *v >= value
                }
            }
        }
    }

    /// True if this bound is less than `value` (used as the lower bound
    /// check).
    fn less(&self, value: f64) -> bool {
        match self {
            ScoreBound::NegInf => true,
            ScoreBound::PosInf => false,
            ScoreBound::Value(v, exclude) => {
                if *exclude {
                    *v < value
                } else {
                    *v <= value
                }
            }
        }
    }

    fn numeric(&self) -> f64 {
        match self {
            ScoreBound::NegInf => f64::NEG_INFINITY,
            ScoreBound::PosInf => f64::INFINITY,
            ScoreBound::Value(v, _) => *v,
        }
    }

    fn is_exclusive(&self) -> bool {
        matches!(self, ScoreBound::Value(_, true))
    }
}

#[derive(Debug, Clone, Copy)]
struct LevelLink {
    forward: Option<usize>,
    span: i64,
}

#[derive(Debug, Clone)]
struct Node {
    member: Bytes,
    score: f64,
    backward: Option<usize>,
    levels: Vec<LevelLink>,
    live: bool,
}

fn key(score: f64, member: &Bytes) -> (f64, &Bytes) {
    (score, member)
}

/// `(score, member)` ordering: by score, then lexicographically by member.
fn less_than(a_score: f64, a_member: &Bytes, b_score: f64, b_member: &Bytes) -> bool {
    key(a_score, a_member) < key(b_score, b_member)
}

fn le(a_score: f64, a_member: &Bytes, b_score: f64, b_member: &Bytes) -> bool {
    key(a_score, a_member) <= key(b_score, b_member)
}

pub struct SkipList {
    nodes: Vec<Node>,
    free: Vec<usize>,
    header: usize,
    tail: Option<usize>,
    length: i64,
    level: usize,
}

/// A snapshot of a node's (member, score), returned from query methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub member: Bytes,
    pub score: f64,
}

impl SkipList {
    pub fn new() -> Self {
        let header = Node {
            member: Bytes::new(),
            score: 0.0,
            backward: None,
            levels: vec![LevelLink { forward: None, span: 0 }; MAX_LEVEL],
            live: true,
        };
        Self {
            nodes: vec![header],
            free: Vec::new(),
            header: 0,
            tail: None,
            length: 0,
            level: 1,
        }
    }

    pub fn len(&self) -> i64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn random_level(&self) -> usize {
        let mut level = 1;
        let mut rng = rand::thread_rng();
        while level < MAX_LEVEL && rng.r#gen::<u32>() < P {
            level += 1;
        }
        level
    }

    fn alloc(&mut self, member: Bytes, score: f64, level: usize) -> usize {
        let node = Node {
            member,
            score,
            backward: None,
            levels: vec![LevelLink { forward: None, span: 0 }; level],
            live: true,
        };
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = node;
            idx
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn entry_of(&self, idx: usize) -> Entry {
        Entry {
            member: self.nodes[idx].member.clone(),
            score: self.nodes[idx].score,
        }
    }

    /// Inserts `(member, score)`, which must not already be present.
    pub fn insert(&mut self, member: Bytes, score: f64) {
        let mut update = [0usize; MAX_LEVEL];
        let mut rank = [0i64; MAX_LEVEL];
        let mut node = self.header;

        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            while let Some(fwd) = self.nodes[node].levels[i].forward {
                let f = &self.nodes[fwd];
                if less_than(f.score, &f.member, score, &member) {
                    rank[i] += self.nodes[node].levels[i].span;
                    node = fwd;
                } else {
                    break;
                }
            }
            update[i] = node;
        }

        let level = self.random_level();
        if level > self.level {
            for lvl in update.iter_mut().take(level).skip(self.level) {
                rank[*lvl] = 0; // placeholder, overwritten below
            }
            for i in self.level..level {
                rank[i] = 0;
                update[i] = self.header;
                self.nodes[self.header].levels[i].span = self.length;
            }
            self.level = level;
        }

        let new_idx = self.alloc(member, score, level);
        for i in 0..level {
            let pred = update[i];
            self.nodes[new_idx].levels[i].forward = self.nodes[pred].levels[i].forward;
            self.nodes[pred].levels[i].forward = Some(new_idx);
            self.nodes[new_idx].levels[i].span =
                self.nodes[pred].levels[i].span - (rank[0] - rank[i]);
            self.nodes[pred].levels[i].span = (rank[0] - rank[i]) + 1;
        }
        for i in level..self.level {
            self.nodes[update[i]].levels[i].span += 1;
        }

        self.nodes[new_idx].backward = if update[0] == self.header {
            None
        } else {
            Some(update[0])
        };
        if let Some(f) = self.nodes[new_idx].levels[0].forward {
            self.nodes[f].backward = Some(new_idx);
        } else {
            self.tail = Some(new_idx);
        }
        self.length += 1;
    }

    fn remove_node(&mut self, idx: usize, update: &[usize; MAX_LEVEL]) {
        for i in 0..self.level {
            if self.nodes[update[i]].levels[i].forward == Some(idx) {
                self.nodes[update[i]].levels[i].span += self.nodes[idx].levels[i].span - 1;
                self.nodes[update[i]].levels[i].forward = self.nodes[idx].levels[i].forward;
            } else {
                self.nodes[update[i]].levels[i].span -= 1;
            }
        }
        if let Some(f) = self.nodes[idx].levels[0].forward {
            self.nodes[f].backward = self.nodes[idx].backward;
        } else {
            self.tail = self.nodes[idx].backward;
        }
        while self.level > 1 && self.nodes[self.header].levels[self.level - 1].forward.is_none() {
            self.level -= 1;
        }
        self.length -= 1;
        self.nodes[idx].live = false;
        self.free.push(idx);
    }

    pub fn remove(&mut self, member: &Bytes, score: f64) -> bool {
        let mut update = [self.header; MAX_LEVEL];
        let mut n = self.header;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[i].forward {
                let f = &self.nodes[fwd];
                if less_than(f.score, &f.member, score, member) {
                    n = fwd;
                } else {
                    break;
                }
            }
            update[i] = n;
        }
        if let Some(candidate) = self.nodes[n].levels[0].forward {
            let c = &self.nodes[candidate];
            if c.score == score && &c.member == member {
                self.remove_node(candidate, &update);
                return true;
            }
        }
        false
    }

    pub fn get_rank(&self, member: &Bytes, score: f64) -> i64 {
        let mut rank: i64 = 0;
        let mut n = self.header;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[i].forward {
                let f = &self.nodes[fwd];
                if le(f.score, &f.member, score, member) {
                    rank += self.nodes[n].levels[i].span;
                    n = fwd;
                } else {
                    break;
                }
            }
            if n != self.header && &self.nodes[n].member == member {
                return rank;
            }
        }
        0
    }

    pub fn get_by_rank(&self, rank: i64) -> Option<Entry> {
        if rank <= 0 {
            return None;
        }
        let mut i: i64 = 0;
        let mut n = self.header;
        for level in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[level].forward {
                if i + self.nodes[n].levels[level].span <= rank {
                    i += self.nodes[n].levels[level].span;
                    n = fwd;
                } else {
                    break;
                }
            }
            if i == rank {
                return Some(self.entry_of(n));
            }
        }
        None
    }

    pub fn has_in_range(&self, min: ScoreBound, max: ScoreBound) -> bool {
        if min.numeric() > max.numeric()
            || (min.numeric() == max.numeric() && (min.is_exclusive() || max.is_exclusive()))
        {
            return false;
        }
        let Some(tail) = self.tail else { return false };
        if !min.less(self.nodes[tail].score) {
            return false;
        }
        let Some(head) = self.nodes[self.header].levels[0].forward else {
            return false;
        };
        if !max.greater(self.nodes[head].score) {
            return false;
        }
        true
    }

    pub fn first_in_score_range(&self, min: ScoreBound, max: ScoreBound) -> Option<Entry> {
        if !self.has_in_range(min, max) {
            return None;
        }
        let mut n = self.header;
        for level in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[level].forward {
                if !min.less(self.nodes[fwd].score) {
                    n = fwd;
                } else {
                    break;
                }
            }
        }
        let n = self.nodes[n].levels[0].forward?;
        if !max.greater(self.nodes[n].score) {
            return None;
        }
        Some(self.entry_of(n))
    }

    pub fn last_in_score_range(&self, min: ScoreBound, max: ScoreBound) -> Option<Entry> {
        if !self.has_in_range(min, max) {
            return None;
        }
        let mut n = self.header;
        for level in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[level].forward {
                if max.greater(self.nodes[fwd].score) {
                    n = fwd;
                } else {
                    break;
                }
            }
        }
        if n == self.header || !min.less(self.nodes[n].score) {
            return None;
        }
        Some(self.entry_of(n))
    }

    /// In-order (ascending) traversal of entries with 0-based `start..=stop`
    /// rank bounds (negative indices resolved by the caller).
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<Entry> {
        if self.length == 0 || start > stop || start >= self.length {
            return Vec::new();
        }
        let stop = stop.min(self.length - 1);
        let mut out = Vec::new();
        let mut idx = match self.find_index_by_rank(start + 1) {
            Some(i) => i,
            None => return out,
        };
        for _ in start..=stop {
            out.push(self.entry_of(idx));
            match self.nodes[idx].levels[0].forward {
                Some(next) => idx = next,
                None => break,
            }
        }
        out
    }

    fn find_index_by_rank(&self, rank: i64) -> Option<usize> {
        if rank <= 0 {
            return None;
        }
        let mut i: i64 = 0;
        let mut n = self.header;
        for level in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[level].forward {
                if i + self.nodes[n].levels[level].span <= rank {
                    i += self.nodes[n].levels[level].span;
                    n = fwd;
                } else {
                    break;
                }
            }
            if i == rank {
                return Some(n);
            }
        }
        None
    }

    pub fn range_by_score(&self, min: ScoreBound, max: ScoreBound) -> Vec<Entry> {
        let mut out = Vec::new();
        let Some(first) = self.first_in_score_range(min, max) else {
            return out;
        };
        let mut idx = self.find_member_index(&first.member, first.score);
        while let Some(i) = idx {
            if !max.greater(self.nodes[i].score) {
                break;
            }
            out.push(self.entry_of(i));
            idx = self.nodes[i].levels[0].forward;
        }
        out
    }

    fn find_member_index(&self, member: &Bytes, score: f64) -> Option<usize> {
        let mut n = self.header;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[i].forward {
                let f = &self.nodes[fwd];
                if less_than(f.score, &f.member, score, member) {
                    n = fwd;
                } else {
                    break;
                }
            }
        }
        let candidate = self.nodes[n].levels[0].forward?;
        if self.nodes[candidate].score == score && &self.nodes[candidate].member == member {
            Some(candidate)
        } else {
            None
        }
    }

    pub fn remove_range_by_score(&mut self, min: ScoreBound, max: ScoreBound) -> Vec<Entry> {
        let mut update = [self.header; MAX_LEVEL];
        let mut n = self.header;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[i].forward {
                if min.less(self.nodes[fwd].score) {
                    n = fwd;
                } else {
                    break;
                }
            }
            update[i] = n;
        }

        let mut removed = Vec::new();
        let mut cur = self.nodes[n].levels[0].forward;
        while let Some(idx) = cur {
            if !max.greater(self.nodes[idx].score) {
                break;
            }
            let next = self.nodes[idx].levels[0].forward;
            removed.push(self.entry_of(idx));
            self.remove_node(idx, &update);
            cur = next;
        }
        removed
    }

    /// Removes entries whose 0-based rank falls in `start..=stop`.
    pub fn remove_range_by_rank(&mut self, start: i64, stop: i64) -> Vec<Entry> {
        if self.length == 0 || start > stop || start >= self.length {
            return Vec::new();
        }
        let stop = stop.min(self.length - 1);
        let target_rank = start + 1; // 1-based

        let mut update = [self.header; MAX_LEVEL];
        let mut i: i64 = 0;
        let mut node = self.header;
        for level in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[node].levels[level].forward {
                if i + self.nodes[node].levels[level].span < target_rank {
                    i += self.nodes[node].levels[level].span;
                    node = fwd;
                } else {
                    break;
                }
            }
            update[level] = node;
        }

        let mut removed = Vec::new();
        let mut cur = self.nodes[node].levels[0].forward;
        let mut rank = start;
        while let Some(idx) = cur {
            if rank > stop {
                break;
            }
            let next = self.nodes[idx].levels[0].forward;
            removed.push(self.entry_of(idx));
            // Recompute predecessors fresh each time since spans shift after
            // every removal; cheap because N is the removal count, not list
            // length, in the common (small range) case.
            update = self.predecessors_for(&self.entry_of(idx));
            self.remove_node(idx, &update);
            cur = next;
            rank += 1;
        }
        removed
    }

    fn predecessors_for(&self, entry: &Entry) -> [usize; MAX_LEVEL] {
        let mut update = [self.header; MAX_LEVEL];
        let mut n = self.header;
        for i in (0..self.level).rev() {
            while let Some(fwd) = self.nodes[n].levels[i].forward {
                let f = &self.nodes[fwd];
                if less_than(f.score, &f.member, entry.score, &entry.member) {
                    n = fwd;
                } else {
                    break;
                }
            }
            update[i] = n;
        }
        update
    }

    /// Testable property #3: for each level, the sum of spans from header to
    /// nil equals the list length.
    #[cfg(test)]
    fn span_sum_invariant_holds(&self) -> bool {
        for level in 0..self.level {
            let mut sum = 0i64;
            let mut n = self.header;
            while let Some(fwd) = self.nodes[n].levels[level].forward {
                sum += self.nodes[n].levels[level].span;
                n = fwd;
            }
            if sum != self.length {
                return false;
            }
        }
        true
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn insert_rank_and_span_invariant() {
        let mut sl = SkipList::new();
        sl.insert(m("a"), 1.0);
        sl.insert(m("b"), 2.0);
        sl.insert(m("c"), 2.0);
        sl.insert(m("d"), 3.0);

        assert_eq!(sl.len(), 4);
        assert_eq!(sl.get_rank(&m("a"), 1.0), 1);
        assert_eq!(sl.get_rank(&m("b"), 2.0), 2);
        assert_eq!(sl.get_rank(&m("c"), 2.0), 3);
        assert_eq!(sl.get_rank(&m("d"), 3.0), 4);
        assert!(sl.span_sum_invariant_holds());
    }

    #[test]
    fn equal_scores_order_lexicographically() {
        let mut sl = SkipList::new();
        sl.insert(m("c"), 2.0);
        sl.insert(m("b"), 2.0);
        let entries = sl.range_by_rank(0, -1 + sl.len());
        assert_eq!(entries[0].member, m("b"));
        assert_eq!(entries[1].member, m("c"));
    }

    #[test]
    fn remove_keeps_span_invariant() {
        let mut sl = SkipList::new();
        for i in 0..50 {
            sl.insert(Bytes::from(format!("m{i}")), i as f64);
        }
        for i in (0..50).step_by(2) {
            assert!(sl.remove(&Bytes::from(format!("m{i}")), i as f64));
        }
        assert_eq!(sl.len(), 25);
        assert!(sl.span_sum_invariant_holds());
    }

    #[test]
    fn score_range_queries() {
        let mut sl = SkipList::new();
        sl.insert(m("a"), 1.0);
        sl.insert(m("b"), 2.0);
        sl.insert(m("c"), 2.0);
        sl.insert(m("d"), 3.0);

        let range = sl.range_by_score(ScoreBound::Value(1.0, true), ScoreBound::Value(3.0, false));
        let members: Vec<_> = range.iter().map(|e| e.member.clone()).collect();
        assert_eq!(members, vec![m("b"), m("c"), m("d")]);
    }

    #[test]
    fn remove_range_by_rank_removes_inclusive_window() {
        let mut sl = SkipList::new();
        for i in 0..10 {
            sl.insert(Bytes::from(format!("m{i}")), i as f64);
        }
        let removed = sl.remove_range_by_rank(2, 4);
        assert_eq!(removed.len(), 3);
        assert_eq!(sl.len(), 7);
        assert!(sl.span_sum_invariant_holds());
    }
}
