// src/main.rs

use anyhow::Result;
use clap::Parser;
use kvdaemon::config::Config;
use kvdaemon::server;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kvdaemon", about = "An in-memory RESP-compatible key-value store")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<String>,

    /// Overrides the configured port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    server::run(config).await
}
