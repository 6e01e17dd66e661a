// tests/integration/keyspace_test.rs

use super::test_helpers::TestContext;
use kvdaemon::core::protocol::RespValue;
use std::thread::sleep;
use std::time::Duration;

#[test]
fn del_removes_keys_and_counts_them() {
    let ctx = TestContext::new();
    ctx.exec(&["SET", "a", "1"]).unwrap();
    ctx.exec(&["SET", "b", "2"]).unwrap();
    assert_eq!(ctx.exec(&["DEL", "a", "b", "missing"]).unwrap(), RespValue::Int(2));
    assert_eq!(ctx.exec(&["EXISTS", "a"]).unwrap(), RespValue::Int(0));
}

#[test]
fn flushdb_clears_every_key() {
    let ctx = TestContext::new();
    ctx.exec(&["SET", "a", "1"]).unwrap();
    ctx.exec(&["SET", "b", "2"]).unwrap();
    assert_eq!(ctx.exec(&["FLUSHDB"]).unwrap(), RespValue::ok());
    assert_eq!(ctx.exec(&["EXISTS", "a"]).unwrap(), RespValue::Int(0));
    assert_eq!(ctx.exec(&["EXISTS", "b"]).unwrap(), RespValue::Int(0));
}

/// Spec edge case E2: a key with a short-lived PEXPIRE reads back as gone
/// once wall-clock time has moved past its expiry.
#[test]
fn pexpire_evicts_key_after_ttl_elapses() {
    let ctx = TestContext::new();
    ctx.exec(&["SET", "k", "v"]).unwrap();
    ctx.exec(&["PEXPIRE", "k", "50"]).unwrap();

    sleep(Duration::from_millis(100));

    assert_eq!(ctx.exec(&["GET", "k"]).unwrap(), RespValue::Nil);
    assert_eq!(ctx.exec(&["EXISTS", "k"]).unwrap(), RespValue::Int(0));
}
