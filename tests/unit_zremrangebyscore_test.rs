// tests/unit_zremrangebyscore_test.rs

use bytes::Bytes;
use kvdaemon::config::Config;
use kvdaemon::core::commands::{self, CommandContext};
use kvdaemon::core::errors::EngineError;
use kvdaemon::core::protocol::RespValue;
use kvdaemon::core::state::ttl::now_ms;
use kvdaemon::core::state::ServerState;

fn argv(parts: &[&str]) -> Vec<Bytes> {
    parts.iter().map(|s| Bytes::copy_from_slice(s.as_bytes())).collect()
}

#[tokio::test]
async fn zremrangebyscore_requires_exactly_four_arguments() {
    let state = ServerState::new(Config::default(), None, None);
    let ctx = CommandContext { state: &state, now_ms: now_ms() };
    let err = commands::dispatch(&ctx, &argv(&["ZREMRANGEBYSCORE", "z", "0"])).unwrap_err();
    assert!(matches!(err, EngineError::WrongArity(_)));
}

#[tokio::test]
async fn zremrangebyscore_deletes_the_key_once_it_is_emptied() {
    let state = ServerState::new(Config::default(), None, None);
    let ctx = CommandContext { state: &state, now_ms: now_ms() };
    commands::dispatch(&ctx, &argv(&["ZADD", "z", "1", "a"])).unwrap();

    assert_eq!(commands::dispatch(&ctx, &argv(&["ZREMRANGEBYSCORE", "z", "0", "5"])).unwrap(), RespValue::Int(1));
    assert_eq!(commands::dispatch(&ctx, &argv(&["EXISTS", "z"])).unwrap(), RespValue::Int(0));
}

#[tokio::test]
async fn zremrangebyscore_rejects_a_malformed_bound() {
    let state = ServerState::new(Config::default(), None, None);
    let ctx = CommandContext { state: &state, now_ms: now_ms() };
    commands::dispatch(&ctx, &argv(&["ZADD", "z", "1", "a"])).unwrap();
    assert!(commands::dispatch(&ctx, &argv(&["ZREMRANGEBYSCORE", "z", "notanumber", "5"])).is_err());
}
