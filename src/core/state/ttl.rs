// src/core/state/ttl.rs

//! Background expiration sweeper. Keys are also checked lazily on every
//! lookup (`Db::expire_if_needed`), but a key nobody reads again would
//! otherwise live forever; this task periodically samples each shard and
//! deletes what it finds expired. Sampling strategy (interval, sample size,
//! re-run threshold) follows the teacher's `TtlManager`: sample a handful of
//! keys per tick, and if a large share of the sample was expired, assume the
//! shard is dense with expired keys and sweep it again immediately rather
//! than waiting for the next tick.

use crate::core::storage::Db;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

const SWEEP_INTERVAL: Duration = Duration::from_millis(100);
const SAMPLE_SIZE: usize = 20;
const RERUN_THRESHOLD: f64 = 0.25;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Runs forever, sweeping one shard per tick in round-robin order. Intended
/// to be spawned once as a background task for the server's lifetime.
pub async fn run_sweeper(db: Arc<Db>) {
    let cursor = AtomicUsize::new(0);
    loop {
        tokio::time::sleep(SWEEP_INTERVAL).await;
        sweep_one_tick(&db, &cursor);
    }
}

fn sweep_one_tick(db: &Db, cursor: &AtomicUsize) {
    let shard_count = db.shard_count();
    if shard_count == 0 {
        return;
    }
    loop {
        let idx = cursor.fetch_add(1, Ordering::Relaxed) % shard_count;
        let expired = sweep_shard_until_sparse(db, idx);
        if expired > 0 {
            debug!(shard = idx, expired, "ttl sweep removed expired keys");
        }
        break;
    }
}

/// Samples and removes expired keys from one shard, re-running immediately
/// while the sample keeps coming back mostly-expired.
fn sweep_shard_until_sparse(db: &Db, shard_index: usize) -> usize {
    let mut total_removed = 0;
    loop {
        let now = now_ms();
        let sample = db.sample_shard_for_ttl(shard_index, SAMPLE_SIZE);
        if sample.is_empty() {
            break;
        }
        let mut removed_this_round = 0;
        for (key, expires_at) in &sample {
            if let Some(t) = expires_at {
                if *t <= now && db.expire_if_needed(key, now) {
                    removed_this_round += 1;
                }
            }
        }
        total_removed += removed_this_round;
        let ratio = removed_this_round as f64 / sample.len() as f64;
        if ratio < RERUN_THRESHOLD {
            break;
        }
    }
    total_removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::data_types::{StoredValue, Value};
    use bytes::Bytes;

    #[test]
    fn sweep_removes_expired_samples() {
        let db = Db::new();
        for i in 0..10u8 {
            db.insert(
                Bytes::from(vec![b'k', i]),
                StoredValue::with_expiry(Value::String(Bytes::from_static(b"v")), 1),
            );
        }
        assert_eq!(db.len(), 10);
        let cursor = AtomicUsize::new(0);
        for _ in 0..db.shard_count() {
            sweep_one_tick(&db, &cursor);
        }
        assert_eq!(db.len(), 0);
    }
}
