// tests/integration/string_commands_test.rs

use super::test_helpers::TestContext;
use kvdaemon::core::protocol::RespValue;

#[test]
fn set_and_get_roundtrip() {
    let ctx = TestContext::new();
    assert_eq!(ctx.exec(&["SET", "a", "1"]).unwrap(), RespValue::ok());
    assert_eq!(ctx.exec(&["GET", "a"]).unwrap(), RespValue::bulk("1"));
}

#[test]
fn get_on_missing_key_is_nil() {
    let ctx = TestContext::new();
    assert_eq!(ctx.exec(&["GET", "nope"]).unwrap(), RespValue::Nil);
}

#[test]
fn mset_sets_every_pair() {
    let ctx = TestContext::new();
    assert_eq!(ctx.exec(&["MSET", "a", "1", "b", "2"]).unwrap(), RespValue::ok());
    assert_eq!(ctx.exec(&["GET", "a"]).unwrap(), RespValue::bulk("1"));
    assert_eq!(ctx.exec(&["GET", "b"]).unwrap(), RespValue::bulk("2"));
}

/// Spec edge case E6: `MSETNX a 1 b 2` with neither key present succeeds and
/// sets both; a subsequent `MSETNX b 3 c 4` where `b` already exists must
/// set nothing at all, not even `c`.
#[test]
fn msetnx_is_all_or_nothing() {
    let ctx = TestContext::new();

    assert_eq!(ctx.exec(&["MSETNX", "a", "1", "b", "2"]).unwrap(), RespValue::Int(1));
    assert_eq!(ctx.exec(&["GET", "a"]).unwrap(), RespValue::bulk("1"));
    assert_eq!(ctx.exec(&["GET", "b"]).unwrap(), RespValue::bulk("2"));

    assert_eq!(ctx.exec(&["MSETNX", "b", "3", "c", "4"]).unwrap(), RespValue::Int(0));
    assert_eq!(ctx.exec(&["GET", "b"]).unwrap(), RespValue::bulk("2"), "existing key must be untouched");
    assert_eq!(ctx.exec(&["GET", "c"]).unwrap(), RespValue::Nil, "key after the conflicting one must not be created");
}

#[test]
fn msetnx_fails_whole_batch_when_any_key_exists() {
    let ctx = TestContext::new();
    assert_eq!(ctx.exec(&["SET", "x", "pre"]).unwrap(), RespValue::ok());
    assert_eq!(ctx.exec(&["MSETNX", "x", "new", "y", "new"]).unwrap(), RespValue::Int(0));
    assert_eq!(ctx.exec(&["GET", "y"]).unwrap(), RespValue::Nil);
}
