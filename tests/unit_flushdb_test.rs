// tests/unit_flushdb_test.rs

use bytes::Bytes;
use kvdaemon::config::Config;
use kvdaemon::core::commands::{self, CommandContext};
use kvdaemon::core::protocol::RespValue;
use kvdaemon::core::state::ttl::now_ms;
use kvdaemon::core::state::ServerState;

fn argv(parts: &[&str]) -> Vec<Bytes> {
    parts.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
}

#[tokio::test]
async fn flushdb_on_an_empty_db_still_reports_ok() {
    let state = ServerState::new(Config::default(), None, None);
    let ctx = CommandContext { state: &state, now_ms: now_ms() };
    assert_eq!(commands::dispatch(&ctx, &argv(&["FLUSHDB"])).unwrap(), RespValue::ok());
}

#[tokio::test]
async fn flushdb_takes_no_arguments() {
    let state = ServerState::new(Config::default(), None, None);
    let ctx = CommandContext { state: &state, now_ms: now_ms() };
    assert!(commands::dispatch(&ctx, &argv(&["FLUSHDB", "extra"])).is_err());
}

#[tokio::test]
async fn flushdb_is_flagged_as_a_write_command_for_aof_propagation() {
    assert!(commands::is_write("FLUSHDB"));
}
