// src/core/commands/set.rs

use super::helpers::parse_i64;
use super::CommandContext;
use crate::core::errors::EngineResult;
use crate::core::protocol::RespValue;
use crate::core::storage::data_types::{StoredValue, Value};
use bytes::Bytes;
use rand::seq::IteratorRandom;
use std::collections::HashSet;

fn read_set(ctx: &CommandContext, key: &[u8]) -> EngineResult<HashSet<Bytes>> {
    ctx.state.db.with_read(key, ctx.now_ms, |v| -> EngineResult<HashSet<Bytes>> {
        match v {
            Some(sv) => Ok(sv.data.as_set()?.clone()),
            None => Ok(HashSet::new()),
        }
    })
}

pub fn sadd(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let key = &argv[1];
    let added = ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<i64> {
        let entry = map
            .entry(key.clone())
            .or_insert_with(|| StoredValue::new(Value::Set(HashSet::new())));
        let set = entry.data.as_set_mut()?;
        let mut added = 0;
        for m in &argv[2..] {
            if set.insert(m.clone()) {
                added += 1;
            }
        }
        Ok(added)
    })?;
    Ok(RespValue::Int(added))
}

pub fn srem(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let removed = ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<i64> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(0);
        };
        let set = sv.data.as_set_mut()?;
        let mut removed = 0;
        for m in &argv[2..] {
            if set.remove(m.as_ref()) {
                removed += 1;
            }
        }
        if set.is_empty() {
            map.remove(argv[1].as_ref());
        }
        Ok(removed)
    })?;
    Ok(RespValue::Int(removed))
}

pub fn smembers(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let set = read_set(ctx, &argv[1])?;
    Ok(RespValue::Array(set.into_iter().map(RespValue::Bulk).collect()))
}

pub fn sismember(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let is_member = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<bool> {
        match v {
            Some(sv) => Ok(sv.data.as_set()?.contains(argv[2].as_ref())),
            None => Ok(false),
        }
    })?;
    Ok(RespValue::Int(is_member as i64))
}

pub fn scard(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let len = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<usize> {
        match v {
            Some(sv) => Ok(sv.data.as_set()?.len()),
            None => Ok(0),
        }
    })?;
    Ok(RespValue::Int(len as i64))
}

pub fn spop(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let count = match argv.get(2) {
        Some(c) => parse_i64(c)? as usize,
        None => 1,
    };
    let popped = ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<Vec<Bytes>> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(Vec::new());
        };
        let set = sv.data.as_set_mut()?;
        let mut rng = rand::thread_rng();
        let chosen: Vec<Bytes> = set.iter().cloned().choose_multiple(&mut rng, count);
        for m in &chosen {
            set.remove(m);
        }
        if set.is_empty() {
            map.remove(argv[1].as_ref());
        }
        Ok(chosen)
    })?;
    if argv.len() == 2 {
        return Ok(popped.into_iter().next().map(RespValue::Bulk).unwrap_or(RespValue::Nil));
    }
    Ok(RespValue::Array(popped.into_iter().map(RespValue::Bulk).collect()))
}

pub fn srandmember(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let set = read_set(ctx, &argv[1])?;
    let mut rng = rand::thread_rng();
    if argv.len() == 2 {
        return Ok(set.into_iter().choose(&mut rng).map(RespValue::Bulk).unwrap_or(RespValue::Nil));
    }
    let count = parse_i64(&argv[2])?;
    let sample: Vec<Bytes> = if count < 0 {
        (0..(-count) as usize)
            .filter_map(|_| set.iter().cloned().choose(&mut rng))
            .collect()
    } else {
        set.into_iter().choose_multiple(&mut rng, count as usize)
    };
    Ok(RespValue::Array(sample.into_iter().map(RespValue::Bulk).collect()))
}

pub fn smove(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    // Both keys' slots are already held below, so the per-key accesses use
    // the `_locked` variants — calling `with_write` here would try to
    // re-acquire a slot this thread already holds and deadlock.
    let _guard = ctx.state.db.locks.locks([argv[1].as_ref(), argv[2].as_ref()]);
    let removed = ctx
        .state
        .db
        .with_write_locked(&argv[1], ctx.now_ms, |map| -> EngineResult<bool> {
            let Some(sv) = map.get_mut(argv[1].as_ref()) else {
                return Ok(false);
            };
            let set = sv.data.as_set_mut()?;
            let removed = set.remove(argv[3].as_ref());
            if set.is_empty() {
                map.remove(argv[1].as_ref());
            }
            Ok(removed)
        })?;
    if !removed {
        return Ok(RespValue::Int(0));
    }
    ctx.state
        .db
        .with_write_locked(&argv[2], ctx.now_ms, |map| -> EngineResult<()> {
            let entry = map
                .entry(argv[2].clone())
                .or_insert_with(|| StoredValue::new(Value::Set(HashSet::new())));
            entry.data.as_set_mut()?.insert(argv[3].clone());
            Ok(())
        })?;
    Ok(RespValue::Int(1))
}

fn combine(ctx: &CommandContext, keys: &[Bytes], op: fn(&mut HashSet<Bytes>, &HashSet<Bytes>)) -> EngineResult<HashSet<Bytes>> {
    let mut acc = read_set(ctx, &keys[0])?;
    for key in &keys[1..] {
        let other = read_set(ctx, key)?;
        op(&mut acc, &other);
    }
    Ok(acc)
}

pub fn sdiff(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let result = combine(ctx, &argv[1..], |a, b| a.retain(|m| !b.contains(m)))?;
    Ok(RespValue::Array(result.into_iter().map(RespValue::Bulk).collect()))
}

pub fn sinter(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let result = combine(ctx, &argv[1..], |a, b| a.retain(|m| b.contains(m)))?;
    Ok(RespValue::Array(result.into_iter().map(RespValue::Bulk).collect()))
}

pub fn sunion(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let result = combine(ctx, &argv[1..], |a, b| a.extend(b.iter().cloned()))?;
    Ok(RespValue::Array(result.into_iter().map(RespValue::Bulk).collect()))
}

fn store(ctx: &CommandContext, dest: &Bytes, result: HashSet<Bytes>) -> EngineResult<RespValue> {
    let len = result.len();
    if result.is_empty() {
        ctx.state.db.remove(dest);
    } else {
        ctx.state.db.insert(dest.clone(), StoredValue::new(Value::Set(result)));
    }
    Ok(RespValue::Int(len as i64))
}

pub fn sdiffstore(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let result = combine(ctx, &argv[2..], |a, b| a.retain(|m| !b.contains(m)))?;
    store(ctx, &argv[1], result)
}

pub fn sinterstore(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let result = combine(ctx, &argv[2..], |a, b| a.retain(|m| b.contains(m)))?;
    store(ctx, &argv[1], result)
}

pub fn sunionstore(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let result = combine(ctx, &argv[2..], |a, b| a.extend(b.iter().cloned()))?;
    store(ctx, &argv[1], result)
}
