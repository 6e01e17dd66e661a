// src/core/errors.rs

//! Error taxonomy for the engine, mapped to exact RESP error strings at the
//! connection boundary by `Display`.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// The single error type threaded through storage, protocol, and command
/// execution. Variants map one-to-one onto the error taxonomy: protocol
/// error, unknown command, wrong arity, type error, value parse error,
/// syntax error, internal error, and AOF write/replay errors.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("ERR protocol error: {0}")]
    Protocol(String),

    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}'")]
    WrongArity(String),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR value is not a valid float")]
    NotAFloat,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR internal error")]
    Internal(String),

    #[error("ERR {0}")]
    Aof(String),

    #[error("{0}")]
    Io(#[from] Arc<io::Error>),
}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        EngineError::Io(Arc::new(e))
    }
}

impl From<std::num::ParseIntError> for EngineError {
    fn from(_: std::num::ParseIntError) -> Self {
        EngineError::NotAnInteger
    }
}

impl From<std::num::ParseFloatError> for EngineError {
    fn from(_: std::num::ParseFloatError) -> Self {
        EngineError::NotAFloat
    }
}

impl From<std::string::FromUtf8Error> for EngineError {
    fn from(_: std::string::FromUtf8Error) -> Self {
        EngineError::Protocol("invalid utf-8".into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
