// src/core/commands/list.rs

use super::helpers::{eq_ignore_case, normalize_index, parse_i64};
use super::CommandContext;
use crate::core::errors::{EngineError, EngineResult};
use crate::core::protocol::RespValue;
use crate::core::storage::data_types::{StoredValue, Value};
use bytes::Bytes;
use std::collections::VecDeque;

fn push(ctx: &CommandContext, key: &Bytes, items: &[Bytes], front: bool) -> EngineResult<i64> {
    ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<i64> {
        let entry = map
            .entry(key.clone())
            .or_insert_with(|| StoredValue::new(Value::List(VecDeque::new())));
        let list = entry.data.as_list_mut()?;
        for item in items {
            if front {
                list.push_front(item.clone());
            } else {
                list.push_back(item.clone());
            }
        }
        Ok(list.len() as i64)
    })
}

pub fn lpush(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    Ok(RespValue::Int(push(ctx, &argv[1], &argv[2..], true)?))
}

pub fn rpush(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    Ok(RespValue::Int(push(ctx, &argv[1], &argv[2..], false)?))
}

fn pop(ctx: &CommandContext, key: &Bytes, count: usize, front: bool) -> EngineResult<Vec<Bytes>> {
    ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<Vec<Bytes>> {
        let Some(entry) = map.get_mut(key.as_ref()) else {
            return Ok(Vec::new());
        };
        let list = entry.data.as_list_mut()?;
        let mut out = Vec::new();
        for _ in 0..count {
            let popped = if front { list.pop_front() } else { list.pop_back() };
            match popped {
                Some(v) => out.push(v),
                None => break,
            }
        }
        if list.is_empty() {
            map.remove(key.as_ref());
        }
        Ok(out)
    })
}

pub fn lpop(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let count = match argv.get(2) {
        Some(c) => parse_i64(c)? as usize,
        None => 1,
    };
    let popped = pop(ctx, &argv[1], count, true)?;
    if argv.len() == 2 {
        return Ok(popped.into_iter().next().map(RespValue::Bulk).unwrap_or(RespValue::Nil));
    }
    Ok(RespValue::Array(popped.into_iter().map(RespValue::Bulk).collect()))
}

pub fn rpop(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let count = match argv.get(2) {
        Some(c) => parse_i64(c)? as usize,
        None => 1,
    };
    let popped = pop(ctx, &argv[1], count, false)?;
    if argv.len() == 2 {
        return Ok(popped.into_iter().next().map(RespValue::Bulk).unwrap_or(RespValue::Nil));
    }
    Ok(RespValue::Array(popped.into_iter().map(RespValue::Bulk).collect()))
}

pub fn llen(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let len = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| match v {
        Some(sv) => sv.data.as_list().map(|l| l.len()),
        None => Ok(0),
    })?;
    Ok(RespValue::Int(len as i64))
}

pub fn lrange(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let start = parse_i64(&argv[2])?;
    let stop = parse_i64(&argv[3])?;
    let items = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Vec<Bytes>> {
        let Some(sv) = v else { return Ok(Vec::new()) };
        let list = sv.data.as_list()?;
        let len = list.len() as i64;
        if len == 0 {
            return Ok(Vec::new());
        }
        let start = normalize_index(start, len).max(0);
        let stop = normalize_index(stop, len).min(len - 1);
        if start > stop || start >= len {
            return Ok(Vec::new());
        }
        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    })?;
    Ok(RespValue::Array(items.into_iter().map(RespValue::Bulk).collect()))
}

pub fn lindex(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let idx = parse_i64(&argv[2])?;
    let item = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Option<Bytes>> {
        let Some(sv) = v else { return Ok(None) };
        let list = sv.data.as_list()?;
        let len = list.len() as i64;
        let idx = normalize_index(idx, len);
        if idx < 0 || idx >= len {
            return Ok(None);
        }
        Ok(list.get(idx as usize).cloned())
    })?;
    Ok(item.map(RespValue::Bulk).unwrap_or(RespValue::Nil))
}

pub fn lset(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let idx = parse_i64(&argv[2])?;
    ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<()> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Err(EngineError::Internal("no such key".into()));
        };
        let list = sv.data.as_list_mut()?;
        let len = list.len() as i64;
        let idx = normalize_index(idx, len);
        if idx < 0 || idx >= len {
            return Err(EngineError::Internal("index out of range".into()));
        }
        list[idx as usize] = argv[3].clone();
        Ok(())
    })?;
    Ok(RespValue::ok())
}

pub fn ltrim(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let start = parse_i64(&argv[2])?;
    let stop = parse_i64(&argv[3])?;
    ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<()> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(());
        };
        let list = sv.data.as_list_mut()?;
        let len = list.len() as i64;
        let start = normalize_index(start, len).max(0);
        let stop = normalize_index(stop, len).min(len - 1);
        let trimmed: VecDeque<Bytes> = if start > stop || start >= len {
            VecDeque::new()
        } else {
            list.iter()
                .skip(start as usize)
                .take((stop - start + 1) as usize)
                .cloned()
                .collect()
        };
        let empty = trimmed.is_empty();
        *list = trimmed;
        if empty {
            map.remove(argv[1].as_ref());
        }
        Ok(())
    })?;
    Ok(RespValue::ok())
}

pub fn lrem(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let count = parse_i64(&argv[2])?;
    let target = &argv[3];
    let removed = ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<i64> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(0);
        };
        let list = sv.data.as_list_mut()?;
        let mut removed = 0;
        let mut kept: VecDeque<Bytes> = VecDeque::with_capacity(list.len());

        if count >= 0 {
            let limit = if count == 0 { i64::MAX } else { count };
            for item in list.drain(..) {
                if removed < limit && &item == target {
                    removed += 1;
                } else {
                    kept.push_back(item);
                }
            }
        } else {
            let limit = -count;
            let mut rev: Vec<Bytes> = list.drain(..).collect();
            rev.reverse();
            let mut kept_rev = Vec::with_capacity(rev.len());
            for item in rev {
                if removed < limit && &item == target {
                    removed += 1;
                } else {
                    kept_rev.push(item);
                }
            }
            kept_rev.reverse();
            kept = kept_rev.into();
        }

        let empty = kept.is_empty();
        *list = kept;
        if empty {
            map.remove(argv[1].as_ref());
        }
        Ok(removed)
    })?;
    Ok(RespValue::Int(removed))
}

pub fn linsert(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let before = if eq_ignore_case(&argv[2], "BEFORE") {
        true
    } else if eq_ignore_case(&argv[2], "AFTER") {
        false
    } else {
        return Err(EngineError::Syntax);
    };
    let pivot = &argv[3];
    let value = &argv[4];

    let len = ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<i64> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(0);
        };
        let list = sv.data.as_list_mut()?;
        let Some(pos) = list.iter().position(|v| v == pivot) else {
            return Ok(-1);
        };
        let insert_at = if before { pos } else { pos + 1 };
        list.insert(insert_at, value.clone());
        Ok(list.len() as i64)
    })?;
    Ok(RespValue::Int(len))
}
