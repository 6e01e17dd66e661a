// src/core/commands/string.rs

use super::helpers::{eq_ignore_case, normalize_index, parse_f64, parse_i64};
use super::CommandContext;
use crate::core::errors::{EngineError, EngineResult};
use crate::core::protocol::RespValue;
use crate::core::storage::data_types::{StoredValue, Value};
use bytes::{Bytes, BytesMut};

fn get_string(ctx: &CommandContext, key: &[u8]) -> EngineResult<Option<Bytes>> {
    ctx.state.db.with_read(key, ctx.now_ms, |v| match v {
        Some(sv) => Ok(Some(sv.data.as_string()?.clone())),
        None => Ok(None),
    })
}

pub fn set(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let key = &argv[1];
    let value = argv[2].clone();
    let mut expires_at_ms = None;
    let mut nx = false;
    let mut xx = false;

    let mut i = 3;
    while i < argv.len() {
        let opt = &argv[i];
        if eq_ignore_case(opt, "EX") {
            i += 1;
            let secs = parse_i64(argv.get(i).ok_or(EngineError::Syntax)?)?;
            expires_at_ms = Some(ctx.now_ms + (secs * 1000) as u64);
        } else if eq_ignore_case(opt, "PX") {
            i += 1;
            let ms = parse_i64(argv.get(i).ok_or(EngineError::Syntax)?)?;
            expires_at_ms = Some(ctx.now_ms + ms as u64);
        } else if eq_ignore_case(opt, "NX") {
            nx = true;
        } else if eq_ignore_case(opt, "XX") {
            xx = true;
        } else {
            return Err(EngineError::Syntax);
        }
        i += 1;
    }

    let exists = ctx.state.db.contains(key, ctx.now_ms);
    if (nx && exists) || (xx && !exists) {
        return Ok(RespValue::Nil);
    }

    let stored = match expires_at_ms {
        Some(t) => StoredValue::with_expiry(Value::String(value), t),
        None => StoredValue::new(Value::String(value)),
    };
    ctx.state.db.insert(key.clone(), stored);
    Ok(RespValue::ok())
}

pub fn get(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    match get_string(ctx, &argv[1])? {
        Some(v) => Ok(RespValue::Bulk(v)),
        None => Ok(RespValue::Nil),
    }
}

pub fn setnx(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    if ctx.state.db.contains(&argv[1], ctx.now_ms) {
        return Ok(RespValue::Int(0));
    }
    ctx.state
        .db
        .insert(argv[1].clone(), StoredValue::new(Value::String(argv[2].clone())));
    Ok(RespValue::Int(1))
}

pub fn setex(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let secs = parse_i64(&argv[2])?;
    if secs <= 0 {
        return Err(EngineError::Syntax);
    }
    let expires_at = ctx.now_ms + (secs * 1000) as u64;
    ctx.state.db.insert(
        argv[1].clone(),
        StoredValue::with_expiry(Value::String(argv[3].clone()), expires_at),
    );
    Ok(RespValue::ok())
}

pub fn psetex(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let ms = parse_i64(&argv[2])?;
    if ms <= 0 {
        return Err(EngineError::Syntax);
    }
    let expires_at = ctx.now_ms + ms as u64;
    ctx.state.db.insert(
        argv[1].clone(),
        StoredValue::with_expiry(Value::String(argv[3].clone()), expires_at),
    );
    Ok(RespValue::ok())
}

pub fn append(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let key = &argv[1];
    let len = ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<usize> {
        match map.get_mut(key.as_ref()) {
            Some(sv) => {
                let s = sv.data.as_string()?;
                let mut buf = BytesMut::from(s.as_ref());
                buf.extend_from_slice(&argv[2]);
                let new = buf.freeze();
                let len = new.len();
                sv.data = Value::String(new);
                Ok(len)
            }
            None => {
                let len = argv[2].len();
                map.insert(key.clone(), StoredValue::new(Value::String(argv[2].clone())));
                Ok(len)
            }
        }
    })?;
    Ok(RespValue::Int(len as i64))
}

pub fn strlen(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let len = get_string(ctx, &argv[1])?.map(|v| v.len()).unwrap_or(0);
    Ok(RespValue::Int(len as i64))
}

pub fn getrange(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let Some(s) = get_string(ctx, &argv[1])? else {
        return Ok(RespValue::Bulk(Bytes::new()));
    };
    let len = s.len() as i64;
    if len == 0 {
        return Ok(RespValue::Bulk(Bytes::new()));
    }
    let start = normalize_index(parse_i64(&argv[2])?, len).min(len - 1).max(0);
    let end = normalize_index(parse_i64(&argv[3])?, len).min(len - 1);
    if start > end {
        return Ok(RespValue::Bulk(Bytes::new()));
    }
    Ok(RespValue::Bulk(s.slice(start as usize..=end as usize)))
}

pub fn setrange(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let key = &argv[1];
    let offset = parse_i64(&argv[2])?;
    if offset < 0 {
        return Err(EngineError::Syntax);
    }
    let offset = offset as usize;
    let patch = &argv[3];

    let len = ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<usize> {
        let mut buf = match map.get(key.as_ref()) {
            Some(sv) => BytesMut::from(sv.data.as_string()?.as_ref()),
            None => BytesMut::new(),
        };
        if buf.len() < offset + patch.len() {
            buf.resize(offset + patch.len(), 0);
        }
        buf[offset..offset + patch.len()].copy_from_slice(patch);
        let new = buf.freeze();
        let len = new.len();
        map.insert(key.clone(), StoredValue::new(Value::String(new)));
        Ok(len)
    })?;
    Ok(RespValue::Int(len as i64))
}

fn incr_by(ctx: &CommandContext, key: &Bytes, delta: i64) -> EngineResult<i64> {
    ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<i64> {
        let current = match map.get(key.as_ref()) {
            Some(sv) => parse_i64(sv.data.as_string()?)?,
            None => 0,
        };
        let new = current.checked_add(delta).ok_or(EngineError::NotAnInteger)?;
        map.insert(key.clone(), StoredValue::new(Value::String(Bytes::from(new.to_string()))));
        Ok(new)
    })
}

pub fn incr(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    Ok(RespValue::Int(incr_by(ctx, &argv[1], 1)?))
}

pub fn decr(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    Ok(RespValue::Int(incr_by(ctx, &argv[1], -1)?))
}

pub fn incrby(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let delta = parse_i64(&argv[2])?;
    Ok(RespValue::Int(incr_by(ctx, &argv[1], delta)?))
}

pub fn decrby(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let delta = parse_i64(&argv[2])?;
    Ok(RespValue::Int(incr_by(ctx, &argv[1], -delta)?))
}

pub fn incrbyfloat(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let delta = parse_f64(&argv[2])?;
    let key = &argv[1];
    let new = ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<f64> {
        let current = match map.get(key.as_ref()) {
            Some(sv) => parse_f64(sv.data.as_string()?)?,
            None => 0.0,
        };
        let new = current + delta;
        map.insert(key.clone(), StoredValue::new(Value::String(Bytes::from(new.to_string()))));
        Ok(new)
    })?;
    Ok(RespValue::Bulk(Bytes::from(new.to_string())))
}

pub fn mget(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let mut out = Vec::with_capacity(argv.len() - 1);
    for key in &argv[1..] {
        out.push(match get_string(ctx, key) {
            Ok(Some(v)) => RespValue::Bulk(v),
            _ => RespValue::Nil,
        });
    }
    Ok(RespValue::Array(out))
}

pub fn mset(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    if (argv.len() - 1) % 2 != 0 {
        return Err(EngineError::WrongArity("MSET".into()));
    }
    for pair in argv[1..].chunks(2) {
        ctx.state
            .db
            .insert(pair[0].clone(), StoredValue::new(Value::String(pair[1].clone())));
    }
    Ok(RespValue::ok())
}

/// All-or-nothing `MSET`: sets every key only if none of them already
/// exist. Holds every target key's lock slot for the whole check-then-set
/// so no other command can observe or create one of the keys in between.
pub fn msetnx(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    if (argv.len() - 1) % 2 != 0 || argv.len() < 3 {
        return Err(EngineError::WrongArity("MSETNX".into()));
    }
    let keys: Vec<&Bytes> = argv[1..].iter().step_by(2).collect();
    let _guard = ctx.state.db.locks.locks(keys.iter().map(|k| k.as_ref()));
    if keys.iter().any(|k| ctx.state.db.contains_locked(k, ctx.now_ms)) {
        return Ok(RespValue::Int(0));
    }
    for pair in argv[1..].chunks(2) {
        ctx.state
            .db
            .insert_locked(pair[0].clone(), StoredValue::new(Value::String(pair[1].clone())));
    }
    Ok(RespValue::Int(1))
}
