// src/core/commands/hash.rs

use super::helpers::parse_i64;
use super::CommandContext;
use crate::core::errors::{EngineError, EngineResult};
use crate::core::protocol::RespValue;
use crate::core::storage::data_types::{StoredValue, Value};
use bytes::Bytes;
use std::collections::HashMap;

fn set_fields(ctx: &CommandContext, key: &Bytes, pairs: &[Bytes]) -> EngineResult<i64> {
    if pairs.len() % 2 != 0 {
        return Err(EngineError::WrongArity("HSET".into()));
    }
    ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<i64> {
        let entry = map
            .entry(key.clone())
            .or_insert_with(|| StoredValue::new(Value::Hash(HashMap::new())));
        let hash = entry.data.as_hash_mut()?;
        let mut added = 0;
        for pair in pairs.chunks(2) {
            if hash.insert(pair[0].clone(), pair[1].clone()).is_none() {
                added += 1;
            }
        }
        Ok(added)
    })
}

pub fn hset(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    Ok(RespValue::Int(set_fields(ctx, &argv[1], &argv[2..])?))
}

pub fn hmset(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    set_fields(ctx, &argv[1], &argv[2..])?;
    Ok(RespValue::ok())
}

pub fn hsetnx(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let key = &argv[1];
    let set = ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<bool> {
        let entry = map
            .entry(key.clone())
            .or_insert_with(|| StoredValue::new(Value::Hash(HashMap::new())));
        let hash = entry.data.as_hash_mut()?;
        if hash.contains_key(argv[2].as_ref()) {
            Ok(false)
        } else {
            hash.insert(argv[2].clone(), argv[3].clone());
            Ok(true)
        }
    })?;
    Ok(RespValue::Int(set as i64))
}

pub fn hget(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let value = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Option<Bytes>> {
        match v {
            Some(sv) => Ok(sv.data.as_hash()?.get(argv[2].as_ref()).cloned()),
            None => Ok(None),
        }
    })?;
    Ok(value.map(RespValue::Bulk).unwrap_or(RespValue::Nil))
}

pub fn hdel(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let removed = ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<i64> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(0);
        };
        let hash = sv.data.as_hash_mut()?;
        let mut removed = 0;
        for field in &argv[2..] {
            if hash.remove(field.as_ref()).is_some() {
                removed += 1;
            }
        }
        if hash.is_empty() {
            map.remove(argv[1].as_ref());
        }
        Ok(removed)
    })?;
    Ok(RespValue::Int(removed))
}

pub fn hexists(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let exists = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<bool> {
        match v {
            Some(sv) => Ok(sv.data.as_hash()?.contains_key(argv[2].as_ref())),
            None => Ok(false),
        }
    })?;
    Ok(RespValue::Int(exists as i64))
}

pub fn hlen(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let len = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<usize> {
        match v {
            Some(sv) => Ok(sv.data.as_hash()?.len()),
            None => Ok(0),
        }
    })?;
    Ok(RespValue::Int(len as i64))
}

pub fn hgetall(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let pairs = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Vec<RespValue>> {
        match v {
            Some(sv) => {
                let mut out = Vec::new();
                for (f, val) in sv.data.as_hash()? {
                    out.push(RespValue::Bulk(f.clone()));
                    out.push(RespValue::Bulk(val.clone()));
                }
                Ok(out)
            }
            None => Ok(Vec::new()),
        }
    })?;
    Ok(RespValue::Array(pairs))
}

pub fn hkeys(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let keys = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Vec<Bytes>> {
        match v {
            Some(sv) => Ok(sv.data.as_hash()?.keys().cloned().collect()),
            None => Ok(Vec::new()),
        }
    })?;
    Ok(RespValue::Array(keys.into_iter().map(RespValue::Bulk).collect()))
}

pub fn hvals(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let vals = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Vec<Bytes>> {
        match v {
            Some(sv) => Ok(sv.data.as_hash()?.values().cloned().collect()),
            None => Ok(Vec::new()),
        }
    })?;
    Ok(RespValue::Array(vals.into_iter().map(RespValue::Bulk).collect()))
}

pub fn hmget(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let out = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Vec<RespValue>> {
        match v {
            Some(sv) => {
                let hash = sv.data.as_hash()?;
                Ok(argv[2..]
                    .iter()
                    .map(|f| hash.get(f.as_ref()).cloned().map(RespValue::Bulk).unwrap_or(RespValue::Nil))
                    .collect())
            }
            None => Ok(argv[2..].iter().map(|_| RespValue::Nil).collect()),
        }
    })?;
    Ok(RespValue::Array(out))
}

pub fn hincrby(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let delta = parse_i64(&argv[3])?;
    let key = &argv[1];
    let new = ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<i64> {
        let entry = map
            .entry(key.clone())
            .or_insert_with(|| StoredValue::new(Value::Hash(HashMap::new())));
        let hash = entry.data.as_hash_mut()?;
        let current = match hash.get(argv[2].as_ref()) {
            Some(v) => parse_i64(v)?,
            None => 0,
        };
        let new = current.checked_add(delta).ok_or(EngineError::NotAnInteger)?;
        hash.insert(argv[2].clone(), Bytes::from(new.to_string()));
        Ok(new)
    })?;
    Ok(RespValue::Int(new))
}
