// tests/integration/zset_commands_test.rs

use super::test_helpers::TestContext;
use kvdaemon::core::protocol::RespValue;

fn bulk_array(items: &[&str]) -> RespValue {
    RespValue::Array(
        items
            .iter()
            .map(|s| RespValue::bulk(s.as_bytes().to_vec()))
            .collect(),
    )
}

/// Spec edge case E3: equal scores break ties lexicographically, `ZRANK`
/// reflects that ordering, and an exclusive/inclusive score range selects
/// the expected members.
#[test]
fn zrange_breaks_score_ties_lexicographically() {
    let ctx = TestContext::new();
    ctx.exec(&["ZADD", "z", "1", "a"]).unwrap();
    ctx.exec(&["ZADD", "z", "2", "b"]).unwrap();
    ctx.exec(&["ZADD", "z", "2", "c"]).unwrap();
    ctx.exec(&["ZADD", "z", "3", "d"]).unwrap();

    assert_eq!(ctx.exec(&["ZRANGE", "z", "0", "-1"]).unwrap(), bulk_array(&["a", "b", "c", "d"]));
    assert_eq!(ctx.exec(&["ZRANK", "z", "c"]).unwrap(), RespValue::Int(2));
}

#[test]
fn zrangebyscore_honors_exclusive_lower_bound() {
    let ctx = TestContext::new();
    ctx.exec(&["ZADD", "z", "1", "a"]).unwrap();
    ctx.exec(&["ZADD", "z", "2", "b"]).unwrap();
    ctx.exec(&["ZADD", "z", "2", "c"]).unwrap();
    ctx.exec(&["ZADD", "z", "3", "d"]).unwrap();

    assert_eq!(ctx.exec(&["ZRANGEBYSCORE", "z", "(1", "3"]).unwrap(), bulk_array(&["b", "c", "d"]));
}

#[test]
fn zremrangebyscore_removes_only_members_in_range() {
    let ctx = TestContext::new();
    ctx.exec(&["ZADD", "z", "1", "a"]).unwrap();
    ctx.exec(&["ZADD", "z", "2", "b"]).unwrap();
    ctx.exec(&["ZADD", "z", "3", "c"]).unwrap();

    assert_eq!(ctx.exec(&["ZREMRANGEBYSCORE", "z", "1", "2"]).unwrap(), RespValue::Int(2));
    assert_eq!(ctx.exec(&["ZRANGE", "z", "0", "-1"]).unwrap(), bulk_array(&["c"]));
}

#[test]
fn zremrangebyscore_on_missing_key_removes_nothing() {
    let ctx = TestContext::new();
    assert_eq!(ctx.exec(&["ZREMRANGEBYSCORE", "nope", "0", "10"]).unwrap(), RespValue::Int(0));
}
