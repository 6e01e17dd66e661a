// src/connection/handler.rs

//! Per-connection RESP state machine (component H): reads frames off the
//! socket, dispatches each as a command, and writes the reply back. Pub/sub
//! commands (`SUBSCRIBE`/`UNSUBSCRIBE`/`PUBLISH`) and `BGREWRITEAOF` are
//! special-cased ahead of the ordinary command table, since they need
//! access the table's handlers don't have (the outbound queue, or the
//! async AOF handle). A background writer task drains a single outbound
//! queue that both command replies and pub/sub pushes feed, so the two
//! never interleave mid-frame on the wire.

use super::guard::ConnectionGuard;
use super::session::Session;
use crate::core::commands::{self, CommandContext};
use crate::core::protocol::{RespFrame, RespFrameCodec, RespValue};
use crate::core::pubsub::PubSubHub;
use crate::core::state::ttl::now_ms;
use crate::core::state::ServerState;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

const GRACEFUL_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn handle_connection(stream: TcpStream, state: Arc<ServerState>) {
    let client_id = state.next_client_id();
    let (session, mut outbound_rx) = Session::new(client_id);
    let _guard = ConnectionGuard::new(state.clone(), client_id);

    let framed = Framed::new(stream, RespFrameCodec);
    let (mut sink, mut stream) = framed.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    while let Some(decoded) = stream.next().await {
        let frame = match decoded {
            Ok(f) => f,
            Err(e) => {
                warn!(client_id, error = %e, "protocol error, closing connection");
                let _ = session.outbound_tx.send(RespFrame::from(RespValue::Error(e.to_string())));
                break;
            }
        };
        let Some(argv) = frame.as_command_args() else {
            let _ = session
                .outbound_tx
                .send(RespFrame::from(RespValue::Error("ERR invalid request".into())));
            continue;
        };
        if argv.is_empty() {
            continue;
        }

        let reply = dispatch_one(&state, &session, &argv).await;
        if session.outbound_tx.send(reply.into()).is_err() {
            break;
        }
    }

    drop(session);
    let _ = tokio::time::timeout(GRACEFUL_CLOSE_TIMEOUT, writer).await;
    debug!(client_id, "connection closed");
}

async fn dispatch_one(state: &Arc<ServerState>, session: &Session, argv: &[Bytes]) -> RespValue {
    let name = String::from_utf8_lossy(&argv[0]).to_ascii_uppercase();
    match name.as_str() {
        "SUBSCRIBE" => {
            if argv.len() < 2 {
                return RespValue::Error("ERR wrong number of arguments for 'subscribe' command".into());
            }
            for channel in &argv[1..] {
                let count = state
                    .pubsub
                    .subscribe(channel.clone(), session.client_id, session.outbound_tx.clone());
                let _ = session
                    .outbound_tx
                    .send(PubSubHub::subscribe_reply(channel, count));
            }
            // Replies are already sent individually per channel above.
            return RespValue::Array(Vec::new());
        }
        "UNSUBSCRIBE" => {
            let channels: Vec<Bytes> = if argv.len() > 1 {
                argv[1..].to_vec()
            } else {
                Vec::new()
            };
            if channels.is_empty() {
                let count = 0;
                let _ = session.outbound_tx.send(PubSubHub::unsubscribe_reply(None, count));
            } else {
                for channel in &channels {
                    let count = state.pubsub.unsubscribe(channel, session.client_id);
                    let _ = session
                        .outbound_tx
                        .send(PubSubHub::unsubscribe_reply(Some(channel), count));
                }
            }
            return RespValue::Array(Vec::new());
        }
        "PUBLISH" => {
            if argv.len() != 3 {
                return RespValue::Error("ERR wrong number of arguments for 'publish' command".into());
            }
            let delivered = state.pubsub.publish(&argv[1], &argv[2]);
            return RespValue::Int(delivered as i64);
        }
        "BGREWRITEAOF" => {
            let Some(aof) = state.aof.clone() else {
                return RespValue::Error("ERR AOF is not enabled".into());
            };
            tokio::spawn(async move {
                if let Err(e) = aof.rewrite(now_ms()).await {
                    warn!(error = %e, "background AOF rewrite failed");
                }
            });
            return RespValue::Status("Background append only file rewriting started".into());
        }
        _ => {}
    }

    let ctx = CommandContext {
        state,
        now_ms: now_ms(),
    };
    match commands::dispatch(&ctx, argv) {
        Ok(value) => {
            if commands::is_write(&name) {
                if let Some(tx) = &state.aof_tx {
                    // Non-blocking: a single dedicated writer task drains
                    // this channel and appends sequentially, so commands
                    // land in the AOF in the order they finished executing
                    // regardless of which connection produced them.
                    let _ = tx.send((argv.to_vec(), ctx.now_ms));
                }
            }
            value
        }
        Err(e) => RespValue::from(e),
    }
}
