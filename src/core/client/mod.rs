// src/core/client/mod.rs

//! Pipelined outbound client (component I): a connection to another RESP
//! endpoint, driven by two decoupled fibers so many requests can be in
//! flight over one socket at once instead of a caller's request blocking
//! behind the previous request's reply.
//!
//! Grounded in the cluster client's connect/write/read timeout discipline
//! (encode with `RespFrameCodec`, bound every I/O with a timeout), but
//! generalized to the writer-fiber/reader-fiber split: the writer drains
//! `sending_rx` and forwards each successfully-written request onto
//! `waiting_tx`; the reader decodes replies off the socket and pairs each
//! one with the oldest outstanding request, which is correct because the
//! remote side replies to a single connection's requests in the order it
//! received them. A `tokio::sync::oneshot` per request stands in for the
//! reply slot, error slot, and countdown latch together: the reader (or a
//! failed writer) fills it, and `send` awaits it with a timeout.

use crate::core::protocol::{RespFrame, RespFrameCodec};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);
const SEND_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_WRITE_RETRIES: u32 = 3;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error, Clone)]
pub enum ClientError {
    #[error("write failed: {0}")]
    WriteFailed(String),
    #[error("request timed out")]
    Timeout,
    #[error("connection closed")]
    ConnectionClosed,
}

type ReplySender = oneshot::Sender<Result<RespFrame, ClientError>>;

struct Request {
    frame: RespFrame,
    reply: ReplySender,
}

/// Handle to a pipelined connection. Cheap to clone; every clone shares the
/// same writer/reader fibers and can call `send` concurrently.
#[derive(Clone)]
pub struct PipelinedClient {
    sending_tx: mpsc::UnboundedSender<Request>,
}

impl PipelinedClient {
    /// Connects to `addr` and spawns its writer fiber, reader fiber, and
    /// heartbeat ticker.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|e| ClientError::WriteFailed(e.to_string()))?;
        let (read_half, write_half) = stream.into_split();

        let (sending_tx, sending_rx) = mpsc::unbounded_channel::<Request>();
        let (waiting_tx, waiting_rx) = mpsc::unbounded_channel::<ReplySender>();
        let (new_half_tx, new_half_rx) = mpsc::unbounded_channel::<OwnedReadHalf>();

        tokio::spawn(writer_fiber(addr, write_half, sending_rx, waiting_tx, new_half_tx));
        tokio::spawn(reader_fiber(read_half, waiting_rx, new_half_rx));

        let client = Self { sending_tx };
        let heartbeat = client.clone();
        tokio::spawn(async move { heartbeat.run_heartbeat().await });
        Ok(client)
    }

    /// Sends one command and waits up to 3 s for its reply.
    pub async fn send(&self, argv: &[Bytes]) -> Result<RespFrame, ClientError> {
        let frame = RespFrame::command(&argv.iter().map(|b| b.as_ref()).collect::<Vec<_>>());
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sending_tx
            .send(Request { frame, reply: reply_tx })
            .map_err(|_| ClientError::ConnectionClosed)?;
        match tokio::time::timeout(SEND_TIMEOUT, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Periodically posts a PING with nobody waiting on its latch, just to
    /// keep the connection observably alive.
    async fn run_heartbeat(&self) {
        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            let (reply_tx, _unused) = oneshot::channel();
            let frame = RespFrame::command(&[b"PING"]);
            if self.sending_tx.send(Request { frame, reply: reply_tx }).is_err() {
                return;
            }
        }
    }
}

async fn writer_fiber(
    addr: SocketAddr,
    mut write_half: OwnedWriteHalf,
    mut sending_rx: mpsc::UnboundedReceiver<Request>,
    waiting_tx: mpsc::UnboundedSender<ReplySender>,
    new_half_tx: mpsc::UnboundedSender<OwnedReadHalf>,
) {
    let mut codec = RespFrameCodec;
    while let Some(req) = sending_rx.recv().await {
        let mut buf = BytesMut::new();
        if codec.encode(req.frame, &mut buf).is_err() {
            let _ = req.reply.send(Err(ClientError::WriteFailed("failed to encode request".into())));
            continue;
        }

        let mut sent = false;
        for attempt in 1..=MAX_WRITE_RETRIES {
            let write_fut = write_half.write_all(&buf);
            match tokio::time::timeout(WRITE_TIMEOUT, write_fut).await {
                Ok(Ok(())) => {
                    sent = true;
                    break;
                }
                Ok(Err(e)) => warn!(attempt, error = %e, %addr, "pipelined client write failed, re-dialing"),
                Err(_) => warn!(attempt, %addr, "pipelined client write timed out, re-dialing"),
            }
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    let (new_read, new_write) = stream.into_split();
                    write_half = new_write;
                    if new_half_tx.send(new_read).is_err() {
                        return; // reader fiber is gone; nothing left to serve replies.
                    }
                }
                Err(e) => warn!(error = %e, %addr, "pipelined client re-dial failed"),
            }
        }

        if sent {
            if waiting_tx.send(req.reply).is_err() {
                return;
            }
        } else {
            let _ = req
                .reply
                .send(Err(ClientError::WriteFailed(format!("write failed after {MAX_WRITE_RETRIES} attempts"))));
        }
    }
}

async fn reader_fiber(
    initial: OwnedReadHalf,
    mut waiting_rx: mpsc::UnboundedReceiver<ReplySender>,
    mut new_half_rx: mpsc::UnboundedReceiver<OwnedReadHalf>,
) {
    use tokio::io::AsyncReadExt;

    let mut codec = RespFrameCodec;
    let mut buf = BytesMut::with_capacity(4096);
    let mut read_half = initial;
    loop {
        tokio::select! {
            biased;
            maybe_fresh = new_half_rx.recv() => {
                match maybe_fresh {
                    Some(fresh) => {
                        read_half = fresh;
                        buf.clear();
                    }
                    None => return,
                }
            }
            result = read_half.read_buf(&mut buf) => {
                match result {
                    Ok(0) | Err(_) => {
                        // This connection generation is dead; block until the
                        // writer fiber hands over a freshly re-dialed half.
                        match new_half_rx.recv().await {
                            Some(fresh) => {
                                read_half = fresh;
                                buf.clear();
                            }
                            None => return,
                        }
                    }
                    Ok(_) => {
                        while let Ok(Some(frame)) = codec.decode(&mut buf) {
                            if let Ok(reply_tx) = waiting_rx.try_recv() {
                                let _ = reply_tx.send(Ok(frame));
                            }
                        }
                    }
                }
            }
        }
    }
}
