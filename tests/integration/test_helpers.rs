// tests/integration/test_helpers.rs

//! Shared harness: a `ServerState` wired up the same way the real server
//! builds one (sans listener), plus a thin `exec` wrapper so tests can drive
//! commands by name instead of hand-building argv/`CommandContext` pairs.

use bytes::Bytes;
use kvdaemon::config::Config;
use kvdaemon::core::commands::{self, CommandContext};
use kvdaemon::core::errors::EngineResult;
use kvdaemon::core::protocol::RespValue;
use kvdaemon::core::state::ttl::now_ms;
use kvdaemon::core::state::ServerState;

pub struct TestContext {
    pub state: ServerState,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            state: ServerState::new(Config::default(), None, None),
        }
    }

    pub fn exec(&self, argv: &[&str]) -> EngineResult<RespValue> {
        self.exec_at(argv, now_ms())
    }

    pub fn exec_at(&self, argv: &[&str], now_ms: u64) -> EngineResult<RespValue> {
        let argv: Vec<Bytes> = argv.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect();
        let ctx = CommandContext { state: &self.state, now_ms };
        commands::dispatch(&ctx, &argv)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
