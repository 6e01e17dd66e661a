// src/core/commands/server.rs

use super::CommandContext;
use crate::core::errors::EngineResult;
use crate::core::protocol::RespValue;
use bytes::Bytes;

pub fn ping(_ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    match argv.get(1) {
        Some(msg) => Ok(RespValue::Bulk(msg.clone())),
        None => Ok(RespValue::Status("PONG".into())),
    }
}
