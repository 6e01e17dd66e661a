// src/config.rs

//! Server configuration, loaded from an optional TOML file and overridable
//! from the command line. Trimmed to the options the spec's external
//! interface names: network bind, AOF persistence, connection limits, and
//! the peer list used for nothing beyond being echoed back (no replication
//! is implemented).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub appendonly: bool,
    pub appendfilename: String,
    pub maxclients: Option<u32>,
    pub peers: Option<Vec<String>>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 6379,
            appendonly: false,
            appendfilename: "appendonly.aof".to_string(),
            maxclients: None,
            peers: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config file {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&text).context("parsing config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be nonzero");
        }
        if self.appendfilename.is_empty() {
            anyhow::bail!("appendfilename must not be empty");
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_port() {
        let mut c = Config::default();
        c.port = 0;
        assert!(c.validate().is_err());
    }
}
