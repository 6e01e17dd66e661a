// src/core/protocol/resp_value.rs

//! `RespValue` is the reply type command handlers return; it is a thin,
//! semantic layer over `RespFrame` (distinguishing e.g. "status reply" from
//! "bulk reply" without committing to wire bytes until render time).

use super::RespFrame;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    Status(String),
    Error(String),
    Int(i64),
    Bulk(Bytes),
    Nil,
    Array(Vec<RespValue>),
    NilArray,
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::Status("OK".into())
    }

    pub fn bulk(b: impl Into<Bytes>) -> Self {
        RespValue::Bulk(b.into())
    }
}

impl From<RespValue> for RespFrame {
    fn from(v: RespValue) -> RespFrame {
        match v {
            RespValue::Status(s) => RespFrame::Simple(s),
            RespValue::Error(e) => RespFrame::Error(e),
            RespValue::Int(n) => RespFrame::Integer(n),
            RespValue::Bulk(b) => RespFrame::Bulk(b),
            RespValue::Nil => RespFrame::NullBulk,
            RespValue::NilArray => RespFrame::NullArray,
            RespValue::Array(items) => {
                RespFrame::Array(items.into_iter().map(RespFrame::from).collect())
            }
        }
    }
}

impl From<crate::core::errors::EngineError> for RespValue {
    fn from(e: crate::core::errors::EngineError) -> Self {
        RespValue::Error(e.to_string())
    }
}
