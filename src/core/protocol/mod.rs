// src/core/protocol/mod.rs

//! RESP (REdis Serialization Protocol) wire format: frames, the pull-state
//! parser, and the reply renderers.

mod resp_frame;
mod resp_value;

pub use resp_frame::{RespFrame, RespFrameCodec};
pub use resp_value::RespValue;
