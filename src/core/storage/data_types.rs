// src/core/storage/data_types.rs

//! The value kinds a key can hold, and the stored wrapper that pairs a value
//! with its expiry. Trimmed to the six kinds the command surface needs:
//! string, list, hash, set, sorted set, and bitmap (bitmap is a storage kind
//! only — no dedicated bit-command surface is implemented).

use crate::core::errors::{EngineError, EngineResult};
use crate::core::storage::zset::SortedSet;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    List,
    Hash,
    Set,
    ZSet,
    Bitmap,
}

impl ValueKind {
    pub fn as_type_name(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Hash => "hash",
            ValueKind::Set => "set",
            ValueKind::ZSet => "zset",
            ValueKind::Bitmap => "string",
        }
    }
}

pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
    Set(HashSet<Bytes>),
    ZSet(SortedSet),
    Bitmap(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Hash(_) => ValueKind::Hash,
            Value::Set(_) => ValueKind::Set,
            Value::ZSet(_) => ValueKind::ZSet,
            Value::Bitmap(_) => ValueKind::Bitmap,
        }
    }

    pub fn as_string(&self) -> EngineResult<&Bytes> {
        match self {
            Value::String(b) => Ok(b),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn as_list(&self) -> EngineResult<&VecDeque<Bytes>> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn as_list_mut(&mut self) -> EngineResult<&mut VecDeque<Bytes>> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn as_hash(&self) -> EngineResult<&HashMap<Bytes, Bytes>> {
        match self {
            Value::Hash(h) => Ok(h),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn as_hash_mut(&mut self) -> EngineResult<&mut HashMap<Bytes, Bytes>> {
        match self {
            Value::Hash(h) => Ok(h),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn as_set(&self) -> EngineResult<&HashSet<Bytes>> {
        match self {
            Value::Set(s) => Ok(s),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn as_set_mut(&mut self) -> EngineResult<&mut HashSet<Bytes>> {
        match self {
            Value::Set(s) => Ok(s),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn as_zset(&self) -> EngineResult<&SortedSet> {
        match self {
            Value::ZSet(z) => Ok(z),
            _ => Err(EngineError::WrongType),
        }
    }

    pub fn as_zset_mut(&mut self) -> EngineResult<&mut SortedSet> {
        match self {
            Value::ZSet(z) => Ok(z),
            _ => Err(EngineError::WrongType),
        }
    }
}

/// A key's value plus its expiry, stored as milliseconds since the Unix
/// epoch. `None` means the key never expires.
pub struct StoredValue {
    pub data: Value,
    pub expires_at_ms: Option<u64>,
}

impl StoredValue {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            expires_at_ms: None,
        }
    }

    pub fn with_expiry(data: Value, expires_at_ms: u64) -> Self {
        Self {
            data,
            expires_at_ms: Some(expires_at_ms),
        }
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at_ms, Some(t) if t <= now_ms)
    }
}
