// tests/unit_msetnx_test.rs

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
async fn msetnx_requires_an_even_number_of_key_value_args() {
    let state = ServerState::new(Config::default(), None, None);
    let ctx = CommandContext { state: &state, now_ms: now_ms() };
    let err = commands::dispatch(&ctx, &argv(&["MSETNX", "a", "1", "b"])).unwrap_err();
    assert!(matches!(err, EngineError::WrongArity(_)));
}

#[tokio::test]
async fn msetnx_sets_all_keys_when_none_exist() {
    let state = ServerState::new(Config::default(), None, None);
    let ctx = CommandContext { state: &state, now_ms: now_ms() };
    assert_eq!(commands::dispatch(&ctx, &argv(&["MSETNX", "a", "1", "b", "2"])).unwrap(), RespValue::Int(1));
}

#[tokio::test]
async fn msetnx_rejects_if_any_key_already_exists() {
    let state = ServerState::new(Config::default(), None, None);
    let ctx = CommandContext { state: &state, now_ms: now_ms() };
    commands::dispatch(&ctx, &argv(&["SET", "a", "0"])).unwrap();
    assert_eq!(commands::dispatch(&ctx, &argv(&["MSETNX", "a", "1", "b", "2"])).unwrap(), RespValue::Int(0));
    assert_eq!(commands::dispatch(&ctx, &argv(&["GET", "b"])).unwrap(), RespValue::Nil);
}
