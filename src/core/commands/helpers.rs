// src/core/commands/helpers.rs

//! Small argument-parsing helpers shared across command handlers.

use crate::core::errors::{EngineError, EngineResult};
use bytes::Bytes;

pub fn parse_i64(b: &Bytes) -> EngineResult<i64> {
    std::str::from_utf8(b)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(EngineError::NotAnInteger)
}

pub fn parse_f64(b: &Bytes) -> EngineResult<f64> {
    std::str::from_utf8(b)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(EngineError::NotAFloat)
}

pub fn eq_ignore_case(a: &[u8], s: &str) -> bool {
    a.eq_ignore_ascii_case(s.as_bytes())
}

/// Resolves a possibly-negative index (as used by LRANGE/LINDEX/GETRANGE)
/// against a length, clamping into `0..len`.
pub fn normalize_index(idx: i64, len: i64) -> i64 {
    if idx < 0 {
        (len + idx).max(0)
    } else {
        idx
    }
}
