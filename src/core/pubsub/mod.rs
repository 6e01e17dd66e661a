// src/core/pubsub/mod.rs

//! Publish/subscribe dispatch (component F): channels map to ordered lists
//! of subscriber handles. The channel table is sharded by FNV-1a hash of the
//! channel name, the same scheme the keyspace dictionary uses for its own
//! shards, so two publishes to different channels never block each other
//! behind one global lock. Delivery sends through each subscriber's own
//! outbound queue rather than writing to their socket directly, so a slow
//! reader can't block the publisher.

use crate::core::protocol::RespFrame;
use crate::core::storage::fnv::fnv1a32;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

pub type ClientId = u64;

const SHARD_COUNT: usize = 16;

struct Subscriber {
    id: ClientId,
    sender: UnboundedSender<RespFrame>,
}

pub struct PubSubHub {
    shards: Vec<RwLock<HashMap<Bytes, Vec<Subscriber>>>>,
    mask: usize,
}

impl Default for PubSubHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSubHub {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            mask: SHARD_COUNT - 1,
        }
    }

    fn shard(&self, channel: &[u8]) -> &RwLock<HashMap<Bytes, Vec<Subscriber>>> {
        &self.shards[(fnv1a32(channel) as usize) & self.mask]
    }

    /// Subscribes `client_id` to `channel`, returning the subscriber's total
    /// channel count after the change.
    pub fn subscribe(
        &self,
        channel: Bytes,
        client_id: ClientId,
        sender: UnboundedSender<RespFrame>,
    ) -> usize {
        {
            let mut shard = self.shard(&channel).write();
            let subs = shard.entry(channel.clone()).or_default();
            if !subs.iter().any(|s| s.id == client_id) {
                subs.push(Subscriber { id: client_id, sender });
            }
        }
        self.count_for_client(client_id)
    }

    pub fn unsubscribe(&self, channel: &[u8], client_id: ClientId) -> usize {
        {
            let mut shard = self.shard(channel).write();
            if let Some(subs) = shard.get_mut(channel) {
                subs.retain(|s| s.id != client_id);
                if subs.is_empty() {
                    shard.remove(channel);
                }
            }
        }
        self.count_for_client(client_id)
    }

    pub fn unsubscribe_all(&self, client_id: ClientId) {
        for shard in &self.shards {
            let mut shard = shard.write();
            shard.retain(|_, subs| {
                subs.retain(|s| s.id != client_id);
                !subs.is_empty()
            });
        }
    }

    /// Counts `client_id`'s subscriptions across every shard; used for the
    /// reply count after a subscribe/unsubscribe, so it must see the whole
    /// client, not just the one channel just touched.
    fn count_for_client(&self, client_id: ClientId) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .values()
                    .filter(|subs| subs.iter().any(|s| s.id == client_id))
                    .count()
            })
            .sum()
    }

    /// Publishes `message` to `channel`, returning the number of
    /// subscribers the message was handed to.
    pub fn publish(&self, channel: &[u8], message: &[u8]) -> usize {
        let subs = {
            let shard = self.shard(channel).read();
            match shard.get(channel) {
                Some(subs) => subs.iter().map(|s| s.sender.clone()).collect::<Vec<_>>(),
                None => return 0,
            }
        };
        let frame = RespFrame::Array(vec![
            RespFrame::Bulk(Bytes::from_static(b"message")),
            RespFrame::Bulk(Bytes::copy_from_slice(channel)),
            RespFrame::Bulk(Bytes::copy_from_slice(message)),
        ]);
        let mut delivered = 0;
        for sender in subs {
            if sender.send(frame.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn subscribe_reply(channel: &[u8], count: usize) -> RespFrame {
        RespFrame::Array(vec![
            RespFrame::Bulk(Bytes::from_static(b"subscribe")),
            RespFrame::Bulk(Bytes::copy_from_slice(channel)),
            RespFrame::Integer(count as i64),
        ])
    }

    pub fn unsubscribe_reply(channel: Option<&[u8]>, count: usize) -> RespFrame {
        RespFrame::Array(vec![
            RespFrame::Bulk(Bytes::from_static(b"unsubscribe")),
            match channel {
                Some(c) => RespFrame::Bulk(Bytes::copy_from_slice(c)),
                None => RespFrame::NullBulk,
            },
            RespFrame::Integer(count as i64),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_delivers_to_all_subscribers() {
        let hub = PubSubHub::new();
        let (tx1, mut rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel();
        hub.subscribe(Bytes::from_static(b"chan"), 1, tx1);
        hub.subscribe(Bytes::from_static(b"chan"), 2, tx2);

        let delivered = hub.publish(b"chan", b"hello");
        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hub = PubSubHub::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        hub.subscribe(Bytes::from_static(b"chan"), 1, tx);
        hub.unsubscribe(b"chan", 1);
        assert_eq!(hub.publish(b"chan", b"x"), 0);
        assert!(rx.try_recv().is_err());
    }
}
