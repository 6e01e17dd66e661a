// src/core/persistence/aof.rs

//! Append-only file durability (component G). Every write command is
//! canonicalized before being appended: relative-TTL commands (`EXPIRE`,
//! `PEXPIRE`, `EXPIREAT`) are rewritten to an absolute `PEXPIREAT` so that
//! replaying the log at a later wall-clock time doesn't shift expiries.
//!
//! Rewriting follows the Start/Rebuild/Finish protocol:
//!
//! - **Start**: record the live file's current length `S` and open a fresh
//!   temp file. Everything appended from this point on keeps landing in the
//!   live file as normal, and is *also* mirrored into a rewrite-buffer
//!   channel.
//! - **Rebuild**: replay only the first `S` bytes of the live file — the
//!   state as of Start — into a throwaway in-memory database, then walk
//!   that snapshot emitting the minimal command to reconstruct each key.
//!   This never touches the real, concurrently-mutating `Db`, so the walk
//!   can't race a live write.
//! - **Finish**: drain whatever the rewrite-buffer channel accumulated
//!   while Rebuild was running, append it after the synthesized commands,
//!   then atomically rename the temp file over the live one and reopen for
//!   append. `pausing`'s write lock brackets this step so no in-flight
//!   append straddles the swap.
//!
//! The first-`S`-bytes replay and the channel capture are complementary,
//! not overlapping: the former reconstructs everything that existed before
//! Start, the latter captures only what arrived strictly after it.

use crate::config::Config;
use crate::core::commands::{self, CommandContext};
use crate::core::errors::{EngineError, EngineResult};
use crate::core::protocol::{RespFrame, RespFrameCodec};
use crate::core::state::ServerState;
use crate::core::storage::data_types::{StoredValue, Value};
use bytes::{Bytes, BytesMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

/// Ceiling on how much live traffic a single rewrite will carry over from
/// its tap channel into the rewritten file. Traffic beyond this during one
/// rewrite window is dropped from the *rewritten* file only — it was never
/// at risk of being lost from the live file, which keeps receiving every
/// append independently of the rewrite.
const REWRITE_REPLAY_CAP: u64 = 64 * 1024 * 1024;

pub struct Aof {
    path: PathBuf,
    file: Mutex<File>,
    /// Held as a read lock by every append; held as a write lock only for
    /// the instant the rewritten file is swapped in.
    pausing: RwLock<()>,
    /// Set for the duration of a rewrite's Rebuild phase; every append
    /// mirrors its encoded bytes here so Finish can carry forward whatever
    /// arrived after Start.
    rewrite_tap: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
}

pub type AofHandle = Arc<Aof>;

impl Aof {
    pub async fn open(path: impl AsRef<Path>) -> EngineResult<AofHandle> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| EngineError::Aof(e.to_string()))?;
        Ok(Arc::new(Aof {
            path,
            file: Mutex::new(file),
            pausing: RwLock::new(()),
            rewrite_tap: Mutex::new(None),
        }))
    }

    /// Appends a command, canonicalizing relative expirations to PEXPIREAT.
    pub async fn append(&self, argv: &[Bytes], now_ms: u64) -> EngineResult<()> {
        let canon = canonicalize(argv, now_ms)?;
        let frame = RespFrame::command(&canon.iter().map(|b| b.as_ref()).collect::<Vec<_>>());
        let bytes = frame.encode_to_vec()?;

        let _pause_guard = self.pausing.read().await;
        let mut file = self.file.lock().await;
        file.write_all(&bytes)
            .await
            .map_err(|e| EngineError::Aof(e.to_string()))?;
        file.flush().await.map_err(|e| EngineError::Aof(e.to_string()))?;
        drop(file);

        if let Some(tap) = self.rewrite_tap.lock().await.as_ref() {
            let _ = tap.send(Bytes::from(bytes));
        }
        Ok(())
    }

    /// Rewrites the log to the minimal set of commands that reconstructs
    /// the keyspace as of this call, per the Start/Rebuild/Finish protocol.
    pub async fn rewrite(&self, now_ms: u64) -> EngineResult<()> {
        let tmp_path = self.path.with_extension("rewrite.tmp");
        let mut tmp = File::create(&tmp_path)
            .await
            .map_err(|e| EngineError::Aof(e.to_string()))?;

        // Start: record the live file's current length and open the tap
        // that will catch everything appended from here on.
        let (tap_tx, mut tap_rx) = mpsc::unbounded_channel::<Bytes>();
        let boundary = {
            let _setup_guard = self.pausing.write().await;
            let len = self
                .file
                .lock()
                .await
                .metadata()
                .await
                .map(|m| m.len())
                .unwrap_or(0);
            *self.rewrite_tap.lock().await = Some(tap_tx);
            len
        };

        // Rebuild: replay the state as of Start into a throwaway database,
        // then synthesize the minimal reconstruction commands from it. Live
        // traffic keeps flowing to the real file and the tap concurrently.
        let snapshot = ServerState::new(Config::default(), None, None);
        replay_bounded(&self.path, boundary, |argv| {
            let ctx = CommandContext { state: &snapshot, now_ms };
            let _ = commands::dispatch(&ctx, &argv);
        })
        .await?;

        let mut buf = BytesMut::new();
        for key in snapshot.db.keys(now_ms) {
            snapshot.db.with_read(&key, now_ms, |entry| {
                if let Some(stored) = entry {
                    for argv in reconstruction_commands(&key, stored) {
                        let frame = RespFrame::command(&argv.iter().map(|b| b.as_ref()).collect::<Vec<_>>());
                        let mut codec = RespFrameCodec;
                        let _ = codec.encode(frame, &mut buf);
                    }
                }
            });
        }
        tmp.write_all(&buf)
            .await
            .map_err(|e| EngineError::Aof(e.to_string()))?;

        // Finish: fold in whatever the tap captured, then swap the file
        // under the pausing write lock so no in-flight append straddles it.
        let _pause_guard = self.pausing.write().await;
        *self.rewrite_tap.lock().await = None;
        let mut carried = 0u64;
        while let Ok(captured) = tap_rx.try_recv() {
            if carried + captured.len() as u64 > REWRITE_REPLAY_CAP {
                warn!(carried, "AOF rewrite tap exceeded replay cap, truncating carryover");
                break;
            }
            carried += captured.len() as u64;
            tmp.write_all(&captured)
                .await
                .map_err(|e| EngineError::Aof(e.to_string()))?;
        }
        tmp.flush().await.map_err(|e| EngineError::Aof(e.to_string()))?;
        drop(tmp);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| EngineError::Aof(e.to_string()))?;
        let new_file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| EngineError::Aof(e.to_string()))?;
        *self.file.lock().await = new_file;
        debug!(boundary, carried, "AOF rewrite finished");
        Ok(())
    }
}

/// Rewrites relative-expiry commands (`EXPIRE key sec`, `PEXPIRE key ms`,
/// `EXPIREAT key unix_sec`) to an absolute `PEXPIREAT key unix_ms`.
fn canonicalize(argv: &[Bytes], now_ms: u64) -> EngineResult<Vec<Bytes>> {
    if argv.is_empty() {
        return Ok(argv.to_vec());
    }
    let name = argv[0].to_ascii_uppercase();
    if argv.len() != 3 {
        return Ok(argv.to_vec());
    }
    let n: i64 = std::str::from_utf8(&argv[2])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(EngineError::NotAnInteger)?;

    let abs_ms = match name.as_slice() {
        b"EXPIRE" => now_ms as i64 + n * 1000,
        b"PEXPIRE" => now_ms as i64 + n,
        b"EXPIREAT" => n * 1000,
        _ => return Ok(argv.to_vec()),
    };
    Ok(vec![
        Bytes::from_static(b"PEXPIREAT"),
        argv[1].clone(),
        Bytes::from(abs_ms.to_string()),
    ])
}

fn reconstruction_commands(key: &Bytes, stored: &StoredValue) -> Vec<Vec<Bytes>> {
    let mut cmds = Vec::new();
    match &stored.data {
        Value::String(s) => {
            cmds.push(vec![Bytes::from_static(b"SET"), key.clone(), s.clone()]);
        }
        Value::Bitmap(b) => {
            cmds.push(vec![
                Bytes::from_static(b"SET"),
                key.clone(),
                Bytes::copy_from_slice(b),
            ]);
        }
        Value::List(items) => {
            if !items.is_empty() {
                let mut argv = vec![Bytes::from_static(b"RPUSH"), key.clone()];
                argv.extend(items.iter().cloned());
                cmds.push(argv);
            }
        }
        Value::Hash(map) => {
            if !map.is_empty() {
                let mut argv = vec![Bytes::from_static(b"HSET"), key.clone()];
                for (f, v) in map {
                    argv.push(f.clone());
                    argv.push(v.clone());
                }
                cmds.push(argv);
            }
        }
        Value::Set(members) => {
            if !members.is_empty() {
                let mut argv = vec![Bytes::from_static(b"SADD"), key.clone()];
                argv.extend(members.iter().cloned());
                cmds.push(argv);
            }
        }
        Value::ZSet(z) => {
            if !z.is_empty() {
                let mut argv = vec![Bytes::from_static(b"ZADD"), key.clone()];
                for (member, score) in z.iter() {
                    argv.push(Bytes::from(score.to_string()));
                    argv.push(member.clone());
                }
                cmds.push(argv);
            }
        }
    }
    if let Some(t) = stored.expires_at_ms {
        cmds.push(vec![
            Bytes::from_static(b"PEXPIREAT"),
            key.clone(),
            Bytes::from(t.to_string()),
        ]);
    }
    cmds
}

/// Replays every command frame in the log at `path`, calling `apply` with
/// its argument list. Used at startup, before the AOF writer is attached, so
/// replayed writes aren't re-appended.
pub async fn replay(path: impl AsRef<Path>, mut apply: impl FnMut(Vec<Bytes>)) -> EngineResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(());
    }
    let mut file = File::open(path).await.map_err(|e| EngineError::Aof(e.to_string()))?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .await
        .map_err(|e| EngineError::Aof(e.to_string()))?;

    let mut buf = BytesMut::from(&raw[..]);
    let mut codec = RespFrameCodec;
    loop {
        match codec.decode(&mut buf) {
            Ok(Some(frame)) => {
                if let Some(args) = frame.as_command_args() {
                    apply(args);
                }
            }
            Ok(None) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Like `replay`, but only decodes frames from the first `limit` bytes of
/// the file at `path` — used by the rewrite's Rebuild phase to reconstruct
/// exactly the state as of the rewrite's Start boundary, ignoring anything
/// appended to the live file afterward.
async fn replay_bounded(path: &Path, limit: u64, mut apply: impl FnMut(Vec<Bytes>)) -> EngineResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut file = File::open(path).await.map_err(|e| EngineError::Aof(e.to_string()))?;
    let mut raw = vec![0u8; limit as usize];
    let read = file
        .read_exact(&mut raw)
        .await
        .map(|_| raw.len())
        .or_else(|e| if e.kind() == std::io::ErrorKind::UnexpectedEof { Ok(0) } else { Err(e) })
        .map_err(|e| EngineError::Aof(e.to_string()))?;
    if read == 0 && limit > 0 {
        return Ok(());
    }

    let mut buf = BytesMut::from(&raw[..]);
    let mut codec = RespFrameCodec;
    loop {
        match codec.decode(&mut buf) {
            Ok(Some(frame)) => {
                if let Some(args) = frame.as_command_args() {
                    apply(args);
                }
            }
            Ok(None) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
