// src/core/commands/zset.rs

use super::helpers::{eq_ignore_case, normalize_index, parse_f64, parse_i64};
use super::CommandContext;
use crate::core::errors::EngineResult;
use crate::core::protocol::RespValue;
use crate::core::storage::data_types::{StoredValue, Value};
use crate::core::storage::zset::{Entry, ScoreBound, SortedSet};
use bytes::Bytes;

fn parse_bound(b: &Bytes) -> EngineResult<ScoreBound> {
    if b.as_ref() == b"-inf" {
        return Ok(ScoreBound::NegInf);
    }
    if b.as_ref() == b"+inf" || b.as_ref() == b"inf" {
        return Ok(ScoreBound::PosInf);
    }
    if let Some(rest) = b.strip_prefix(b"(") {
        let v = parse_f64(&Bytes::copy_from_slice(rest))?;
        return Ok(ScoreBound::Value(v, true));
    }
    Ok(ScoreBound::Value(parse_f64(b)?, false))
}

fn entries_to_flat(entries: Vec<Entry>, with_scores: bool) -> Vec<RespValue> {
    let mut out = Vec::new();
    for e in entries {
        out.push(RespValue::Bulk(e.member));
        if with_scores {
            out.push(RespValue::Bulk(Bytes::from(e.score.to_string())));
        }
    }
    out
}

pub fn zadd(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let pairs = &argv[2..];
    if pairs.len() % 2 != 0 {
        return Err(crate::core::errors::EngineError::Syntax);
    }
    let key = &argv[1];
    let added = ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<i64> {
        let entry = map
            .entry(key.clone())
            .or_insert_with(|| StoredValue::new(Value::ZSet(SortedSet::new())));
        let zset = entry.data.as_zset_mut()?;
        let mut added = 0;
        for pair in pairs.chunks(2) {
            let score = parse_f64(&pair[0])?;
            if zset.insert(pair[1].clone(), score) {
                added += 1;
            }
        }
        Ok(added)
    })?;
    Ok(RespValue::Int(added))
}

pub fn zscore(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let score = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Option<f64>> {
        match v {
            Some(sv) => Ok(sv.data.as_zset()?.score(&argv[2])),
            None => Ok(None),
        }
    })?;
    Ok(score.map(|s| RespValue::Bulk(Bytes::from(s.to_string()))).unwrap_or(RespValue::Nil))
}

pub fn zrem(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let removed = ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<i64> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(0);
        };
        let zset = sv.data.as_zset_mut()?;
        let mut removed = 0;
        for m in &argv[2..] {
            if zset.remove(m) {
                removed += 1;
            }
        }
        if zset.is_empty() {
            map.remove(argv[1].as_ref());
        }
        Ok(removed)
    })?;
    Ok(RespValue::Int(removed))
}

pub fn zcard(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let len = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<usize> {
        match v {
            Some(sv) => Ok(sv.data.as_zset()?.len()),
            None => Ok(0),
        }
    })?;
    Ok(RespValue::Int(len as i64))
}

fn rank(ctx: &CommandContext, key: &Bytes, member: &Bytes, reverse: bool) -> EngineResult<Option<i64>> {
    ctx.state.db.with_read(key, ctx.now_ms, |v| -> EngineResult<Option<i64>> {
        match v {
            Some(sv) => {
                let zset = sv.data.as_zset()?;
                Ok(zset.rank(member).map(|r| {
                    if reverse {
                        zset.len() as i64 - 1 - r
                    } else {
                        r
                    }
                }))
            }
            None => Ok(None),
        }
    })
}

pub fn zrank(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    Ok(rank(ctx, &argv[1], &argv[2], false)?.map(RespValue::Int).unwrap_or(RespValue::Nil))
}

pub fn zrevrank(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    Ok(rank(ctx, &argv[1], &argv[2], true)?.map(RespValue::Int).unwrap_or(RespValue::Nil))
}

pub fn zincrby(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let delta = parse_f64(&argv[2])?;
    let key = &argv[1];
    let new = ctx.state.db.with_write(key, ctx.now_ms, |map| -> EngineResult<f64> {
        let entry = map
            .entry(key.clone())
            .or_insert_with(|| StoredValue::new(Value::ZSet(SortedSet::new())));
        Ok(entry.data.as_zset_mut()?.increment(argv[3].clone(), delta))
    })?;
    Ok(RespValue::Bulk(Bytes::from(new.to_string())))
}

fn range_by_rank_cmd(ctx: &CommandContext, argv: &[Bytes], reverse: bool) -> EngineResult<RespValue> {
    let with_scores = argv.get(4).is_some_and(|o| eq_ignore_case(o, "WITHSCORES"));
    let start = parse_i64(&argv[2])?;
    let stop = parse_i64(&argv[3])?;
    let entries = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Vec<Entry>> {
        match v {
            Some(sv) => {
                let zset = sv.data.as_zset()?;
                let len = zset.len() as i64;
                let (s, e) = (normalize_index(start, len), normalize_index(stop, len));
                let mut entries = zset.range_by_rank(s, e);
                if reverse {
                    entries.reverse();
                }
                Ok(entries)
            }
            None => Ok(Vec::new()),
        }
    })?;
    Ok(RespValue::Array(entries_to_flat(entries, with_scores)))
}

pub fn zrange(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    range_by_rank_cmd(ctx, argv, false)
}

pub fn zrevrange(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    range_by_rank_cmd(ctx, argv, true)
}

fn range_by_score_cmd(ctx: &CommandContext, argv: &[Bytes], reverse: bool) -> EngineResult<RespValue> {
    let with_scores = argv.get(4).is_some_and(|o| eq_ignore_case(o, "WITHSCORES"));
    let (min, max) = if reverse {
        (parse_bound(&argv[3])?, parse_bound(&argv[2])?)
    } else {
        (parse_bound(&argv[2])?, parse_bound(&argv[3])?)
    };
    let entries = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<Vec<Entry>> {
        match v {
            Some(sv) => {
                let mut entries = sv.data.as_zset()?.range_by_score(min, max);
                if reverse {
                    entries.reverse();
                }
                Ok(entries)
            }
            None => Ok(Vec::new()),
        }
    })?;
    Ok(RespValue::Array(entries_to_flat(entries, with_scores)))
}

pub fn zrangebyscore(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    range_by_score_cmd(ctx, argv, false)
}

pub fn zrevrangebyscore(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    range_by_score_cmd(ctx, argv, true)
}

pub fn zcount(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let min = parse_bound(&argv[2])?;
    let max = parse_bound(&argv[3])?;
    let count = ctx.state.db.with_read(&argv[1], ctx.now_ms, |v| -> EngineResult<usize> {
        match v {
            Some(sv) => Ok(sv.data.as_zset()?.range_by_score(min, max).len()),
            None => Ok(0),
        }
    })?;
    Ok(RespValue::Int(count as i64))
}

pub fn zremrangebyrank(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let start = parse_i64(&argv[2])?;
    let stop = parse_i64(&argv[3])?;
    let removed = ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<usize> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(0);
        };
        let zset = sv.data.as_zset_mut()?;
        let len = zset.len() as i64;
        let s = normalize_index(start, len);
        let e = normalize_index(stop, len);
        let removed = zset.remove_range_by_rank(s, e).len();
        if zset.is_empty() {
            map.remove(argv[1].as_ref());
        }
        Ok(removed)
    })?;
    Ok(RespValue::Int(removed as i64))
}

pub fn zremrangebyscore(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let min = parse_bound(&argv[2])?;
    let max = parse_bound(&argv[3])?;
    let removed = ctx.state.db.with_write(&argv[1], ctx.now_ms, |map| -> EngineResult<usize> {
        let Some(sv) = map.get_mut(argv[1].as_ref()) else {
            return Ok(0);
        };
        let zset = sv.data.as_zset_mut()?;
        let removed = zset.remove_range_by_score(min, max).len();
        if zset.is_empty() {
            map.remove(argv[1].as_ref());
        }
        Ok(removed)
    })?;
    Ok(RespValue::Int(removed as i64))
}
