// src/core/state/mod.rs

//! `ServerState`: the handles every connection and background task shares —
//! the keyspace, the pub/sub hub, and the AOF writer. Held behind an `Arc`
//! and cloned into each spawned connection task.

pub mod ttl;

use crate::config::Config;
use crate::core::persistence::aof::AofHandle;
use crate::core::pubsub::PubSubHub;
use crate::core::storage::Db;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// One queued write command, as it crosses from the connection that executed
/// it to the single AOF writer task: the canonical argv plus the wall-clock
/// time to canonicalize relative expirations against.
pub type AofAppend = (Vec<Bytes>, u64);

pub struct ServerState {
    pub db: Arc<Db>,
    pub pubsub: PubSubHub,
    pub aof: Option<AofHandle>,
    /// Feeds the single AOF writer task (see `server::initialization`), so
    /// every connection's writes append in the order they completed rather
    /// than racing each other across independent tasks.
    pub aof_tx: Option<UnboundedSender<AofAppend>>,
    pub config: Config,
    next_client_id: AtomicU64,
}

impl ServerState {
    pub fn new(config: Config, aof: Option<AofHandle>, aof_tx: Option<UnboundedSender<AofAppend>>) -> Self {
        Self {
            db: Arc::new(Db::new()),
            pubsub: PubSubHub::new(),
            aof,
            aof_tx,
            config,
            next_client_id: AtomicU64::new(1),
        }
    }

    pub fn next_client_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }
}
