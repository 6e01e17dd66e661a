// src/connection/session.rs

//! Per-connection state: the client's id (used as its pub/sub subscriber
//! key) and the outbound queue pub/sub delivery and command replies share,
//! so a publish to a subscribed client and a reply to that client's own
//! command never race on the socket.

use crate::core::protocol::RespFrame;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub struct Session {
    pub client_id: u64,
    pub outbound_tx: UnboundedSender<RespFrame>,
}

impl Session {
    pub fn new(client_id: u64) -> (Self, UnboundedReceiver<RespFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Session {
                client_id,
                outbound_tx: tx,
            },
            rx,
        )
    }
}
