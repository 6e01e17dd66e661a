// src/server/initialization.rs

//! Server bootstrap: load config, open (and replay) the AOF if enabled,
//! bind the listener, and spawn the background TTL sweeper alongside the
//! accept loop. `maxclients` is enforced with a semaphore so a connection
//! storm degrades to queued accepts rather than unbounded task growth.

use crate::config::Config;
use crate::connection::handle_connection;
use crate::core::commands::{self, CommandContext};
use crate::core::persistence::aof::{self, Aof};
use crate::core::state::ttl::{now_ms, run_sweeper};
use crate::core::state::ServerState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info};

pub async fn run(config: Config) -> Result<()> {
    let (aof_handle, aof_tx) = if config.appendonly {
        let handle = Aof::open(&config.appendfilename)
            .await
            .context("opening AOF file")?;
        let (tx, mut rx) = mpsc::unbounded_channel::<crate::core::state::AofAppend>();
        let writer_handle = handle.clone();
        tokio::spawn(async move {
            while let Some((argv, now)) = rx.recv().await {
                if let Err(e) = writer_handle.append(&argv, now).await {
                    error!(error = %e, "AOF append failed");
                }
            }
        });
        (Some(handle), Some(tx))
    } else {
        (None, None)
    };

    let state = Arc::new(ServerState::new(config.clone(), aof_handle, aof_tx));

    if config.appendonly {
        replay_aof(&state, &config.appendfilename).await?;
    }

    tokio::spawn(run_sweeper(state.db.clone()));

    let listener = TcpListener::bind(config.address())
        .await
        .with_context(|| format!("binding {}", config.address()))?;
    info!(address = %config.address(), "listening");

    let max_clients = config.maxclients.unwrap_or(10_000) as usize;
    let semaphore = Arc::new(Semaphore::new(max_clients));

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "accept failed");
                continue;
            }
        };
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed");
        let state = state.clone();
        tokio::spawn(async move {
            let _permit = permit;
            info!(%peer, "client connected");
            handle_connection(socket, state).await;
        });
    }
}

async fn replay_aof(state: &Arc<ServerState>, path: &str) -> Result<()> {
    let mut applied = 0usize;
    aof::replay(path, |argv| {
        let ctx = CommandContext {
            state,
            now_ms: now_ms(),
        };
        if commands::dispatch(&ctx, &argv).is_ok() {
            applied += 1;
        }
    })
    .await
    .context("replaying AOF")?;
    info!(applied, "AOF replay complete");
    Ok(())
}
