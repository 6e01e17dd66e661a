// src/core/commands/keyspace.rs

use super::helpers::parse_i64;
use super::CommandContext;
use crate::core::errors::EngineResult;
use crate::core::protocol::RespValue;
use bytes::Bytes;

pub fn del(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let _guard = ctx.state.db.locks.locks(argv[1..].iter().map(|k| k.as_ref()));
    let mut count = 0;
    for key in &argv[1..] {
        if ctx.state.db.remove_locked(key).is_some() {
            count += 1;
        }
    }
    Ok(RespValue::Int(count))
}

pub fn flushdb(ctx: &CommandContext, _argv: &[Bytes]) -> EngineResult<RespValue> {
    ctx.state.db.clear();
    Ok(RespValue::ok())
}

pub fn exists(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let count = argv[1..]
        .iter()
        .filter(|k| ctx.state.db.contains(k, ctx.now_ms))
        .count();
    Ok(RespValue::Int(count as i64))
}

fn set_expiry(ctx: &CommandContext, key: &Bytes, expires_at_ms: u64) -> RespValue {
    if ctx.state.db.expire(key, ctx.now_ms, expires_at_ms) {
        RespValue::Int(1)
    } else {
        RespValue::Int(0)
    }
}

pub fn expire(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let secs = parse_i64(&argv[2])?;
    Ok(set_expiry(ctx, &argv[1], ctx.now_ms + (secs * 1000) as u64))
}

pub fn pexpire(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let ms = parse_i64(&argv[2])?;
    Ok(set_expiry(ctx, &argv[1], ctx.now_ms + ms as u64))
}

pub fn expireat(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let unix_secs = parse_i64(&argv[2])?;
    Ok(set_expiry(ctx, &argv[1], (unix_secs * 1000) as u64))
}

pub fn pexpireat(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let unix_ms = parse_i64(&argv[2])?;
    Ok(set_expiry(ctx, &argv[1], unix_ms as u64))
}

pub fn ttl(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    match ctx.state.db.ttl_ms(&argv[1], ctx.now_ms) {
        None => Ok(RespValue::Int(-2)),
        Some(None) => Ok(RespValue::Int(-1)),
        Some(Some(ms)) => Ok(RespValue::Int((ms / 1000) as i64)),
    }
}

pub fn pttl(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    match ctx.state.db.ttl_ms(&argv[1], ctx.now_ms) {
        None => Ok(RespValue::Int(-2)),
        Some(None) => Ok(RespValue::Int(-1)),
        Some(Some(ms)) => Ok(RespValue::Int(ms as i64)),
    }
}

pub fn persist(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    Ok(RespValue::Int(ctx.state.db.persist(&argv[1], ctx.now_ms) as i64))
}

pub fn type_cmd(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let kind = ctx
        .state
        .db
        .with_read(&argv[1], ctx.now_ms, |v| v.map(|sv| sv.data.kind()));
    match kind {
        Some(k) => Ok(RespValue::Status(k.as_type_name().to_string())),
        None => Ok(RespValue::Status("none".to_string())),
    }
}

pub fn keys(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    // Only the `*` wildcard (match-all) is implemented; anything else is
    // treated as a literal key lookup, matching the command's minimal scope.
    let pattern = &argv[1];
    let all = ctx.state.db.keys(ctx.now_ms);
    if pattern.as_ref() == b"*" {
        return Ok(RespValue::Array(all.into_iter().map(RespValue::Bulk).collect()));
    }
    let matched = all.into_iter().filter(|k| k == pattern).collect::<Vec<_>>();
    Ok(RespValue::Array(matched.into_iter().map(RespValue::Bulk).collect()))
}

pub fn randomkey(ctx: &CommandContext, _argv: &[Bytes]) -> EngineResult<RespValue> {
    match ctx.state.db.random_key(ctx.now_ms) {
        Some(k) => Ok(RespValue::Bulk(k)),
        None => Ok(RespValue::Nil),
    }
}

pub fn rename(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let _guard = ctx.state.db.locks.locks([argv[1].as_ref(), argv[2].as_ref()]);
    match ctx.state.db.remove_locked(&argv[1]) {
        Some(v) => {
            ctx.state.db.insert_locked(argv[2].clone(), v);
            Ok(RespValue::ok())
        }
        None => Err(crate::core::errors::EngineError::Internal(
            "no such key".into(),
        )),
    }
}

pub fn renamenx(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let _guard = ctx.state.db.locks.locks([argv[1].as_ref(), argv[2].as_ref()]);
    if ctx.state.db.contains_locked(&argv[2], ctx.now_ms) {
        return Ok(RespValue::Int(0));
    }
    match ctx.state.db.remove_locked(&argv[1]) {
        Some(v) => {
            ctx.state.db.insert_locked(argv[2].clone(), v);
            Ok(RespValue::Int(1))
        }
        None => Err(crate::core::errors::EngineError::Internal(
            "no such key".into(),
        )),
    }
}
