// src/connection/guard.rs

//! RAII cleanup for a connection: dropping the guard unsubscribes the
//! client from every pub/sub channel it joined, regardless of how the
//! connection ended (client close, protocol error, shutdown).

use crate::core::state::ServerState;
use std::sync::Arc;

pub struct ConnectionGuard {
    state: Arc<ServerState>,
    client_id: u64,
}

impl ConnectionGuard {
    pub fn new(state: Arc<ServerState>, client_id: u64) -> Self {
        Self { state, client_id }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.pubsub.unsubscribe_all(self.client_id);
    }
}
