// src/core/commands/mod.rs

//! Router/executor glue (component J): a command table built once at
//! startup, mapping a command name to its arity, propagation flags, and
//! handler function. Dispatch looks the name up, checks arity, runs the
//! handler, and — for write commands — propagates the original argv to the
//! AOF.

mod hash;
mod helpers;
mod keyspace;
mod list;
mod server;
mod set;
mod string;
mod zset;

use crate::core::errors::{EngineError, EngineResult};
use crate::core::protocol::RespValue;
use crate::core::state::ServerState;
use bitflags::bitflags;
use bytes::Bytes;
use once_cell::sync::Lazy;
use std::collections::HashMap;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u8 {
        const WRITE    = 0b0001;
        const READONLY = 0b0010;
        const PUBSUB   = 0b0100;
        const ADMIN    = 0b1000;
    }
}

pub struct CommandContext<'a> {
    pub state: &'a ServerState,
    pub now_ms: u64,
}

pub type Handler = fn(&CommandContext, &[Bytes]) -> EngineResult<RespValue>;

pub struct CommandSpec {
    pub name: &'static str,
    /// Positive = exact argc (including the command name); negative =
    /// minimum argc.
    pub arity: i32,
    pub flags: CommandFlags,
    pub handler: Handler,
}

fn arity_ok(arity: i32, argc: usize) -> bool {
    if arity >= 0 {
        argc as i32 == arity
    } else {
        argc as i32 >= -arity
    }
}

macro_rules! define_commands {
    ($( $name:literal => $arity:expr, $flags:expr, $handler:path ),* $(,)?) => {
        &[ $( CommandSpec { name: $name, arity: $arity, flags: $flags, handler: $handler } ),* ]
    };
}

static COMMANDS: &[CommandSpec] = define_commands! {
    // Strings
    "SET" => -3, CommandFlags::WRITE, string::set,
    "GET" => 2, CommandFlags::READONLY, string::get,
    "SETNX" => 3, CommandFlags::WRITE, string::setnx,
    "SETEX" => 4, CommandFlags::WRITE, string::setex,
    "PSETEX" => 4, CommandFlags::WRITE, string::psetex,
    "APPEND" => 3, CommandFlags::WRITE, string::append,
    "STRLEN" => 2, CommandFlags::READONLY, string::strlen,
    "GETRANGE" => 4, CommandFlags::READONLY, string::getrange,
    "SETRANGE" => 4, CommandFlags::WRITE, string::setrange,
    "INCR" => 2, CommandFlags::WRITE, string::incr,
    "DECR" => 2, CommandFlags::WRITE, string::decr,
    "INCRBY" => 3, CommandFlags::WRITE, string::incrby,
    "DECRBY" => 3, CommandFlags::WRITE, string::decrby,
    "INCRBYFLOAT" => 3, CommandFlags::WRITE, string::incrbyfloat,
    "MGET" => -2, CommandFlags::READONLY, string::mget,
    "MSET" => -3, CommandFlags::WRITE, string::mset,
    "MSETNX" => -3, CommandFlags::WRITE, string::msetnx,

    // Keyspace
    "DEL" => -2, CommandFlags::WRITE, keyspace::del,
    "FLUSHDB" => 1, CommandFlags::WRITE.union(CommandFlags::ADMIN), keyspace::flushdb,
    "EXISTS" => -2, CommandFlags::READONLY, keyspace::exists,
    "EXPIRE" => 3, CommandFlags::WRITE, keyspace::expire,
    "PEXPIRE" => 3, CommandFlags::WRITE, keyspace::pexpire,
    "EXPIREAT" => 3, CommandFlags::WRITE, keyspace::expireat,
    "PEXPIREAT" => 3, CommandFlags::WRITE, keyspace::pexpireat,
    "TTL" => 2, CommandFlags::READONLY, keyspace::ttl,
    "PTTL" => 2, CommandFlags::READONLY, keyspace::pttl,
    "PERSIST" => 2, CommandFlags::WRITE, keyspace::persist,
    "TYPE" => 2, CommandFlags::READONLY, keyspace::type_cmd,
    "KEYS" => 2, CommandFlags::READONLY, keyspace::keys,
    "RANDOMKEY" => 1, CommandFlags::READONLY, keyspace::randomkey,
    "RENAME" => 3, CommandFlags::WRITE, keyspace::rename,
    "RENAMENX" => 3, CommandFlags::WRITE, keyspace::renamenx,

    // Lists
    "LPUSH" => -3, CommandFlags::WRITE, list::lpush,
    "RPUSH" => -3, CommandFlags::WRITE, list::rpush,
    "LPOP" => -2, CommandFlags::WRITE, list::lpop,
    "RPOP" => -2, CommandFlags::WRITE, list::rpop,
    "LLEN" => 2, CommandFlags::READONLY, list::llen,
    "LRANGE" => 4, CommandFlags::READONLY, list::lrange,
    "LINDEX" => 3, CommandFlags::READONLY, list::lindex,
    "LSET" => 4, CommandFlags::WRITE, list::lset,
    "LTRIM" => 4, CommandFlags::WRITE, list::ltrim,
    "LREM" => 4, CommandFlags::WRITE, list::lrem,
    "LINSERT" => 5, CommandFlags::WRITE, list::linsert,

    // Hashes
    "HSET" => -4, CommandFlags::WRITE, hash::hset,
    "HGET" => 3, CommandFlags::READONLY, hash::hget,
    "HDEL" => -3, CommandFlags::WRITE, hash::hdel,
    "HEXISTS" => 3, CommandFlags::READONLY, hash::hexists,
    "HLEN" => 2, CommandFlags::READONLY, hash::hlen,
    "HGETALL" => 2, CommandFlags::READONLY, hash::hgetall,
    "HKEYS" => 2, CommandFlags::READONLY, hash::hkeys,
    "HVALS" => 2, CommandFlags::READONLY, hash::hvals,
    "HMGET" => -3, CommandFlags::READONLY, hash::hmget,
    "HMSET" => -4, CommandFlags::WRITE, hash::hmset,
    "HSETNX" => 4, CommandFlags::WRITE, hash::hsetnx,
    "HINCRBY" => 4, CommandFlags::WRITE, hash::hincrby,

    // Sets
    "SADD" => -3, CommandFlags::WRITE, set::sadd,
    "SREM" => -3, CommandFlags::WRITE, set::srem,
    "SMEMBERS" => 2, CommandFlags::READONLY, set::smembers,
    "SISMEMBER" => 3, CommandFlags::READONLY, set::sismember,
    "SCARD" => 2, CommandFlags::READONLY, set::scard,
    "SPOP" => -2, CommandFlags::WRITE, set::spop,
    "SRANDMEMBER" => -2, CommandFlags::READONLY, set::srandmember,
    "SMOVE" => 4, CommandFlags::WRITE, set::smove,
    "SDIFF" => -2, CommandFlags::READONLY, set::sdiff,
    "SINTER" => -2, CommandFlags::READONLY, set::sinter,
    "SUNION" => -2, CommandFlags::READONLY, set::sunion,
    "SDIFFSTORE" => -3, CommandFlags::WRITE, set::sdiffstore,
    "SINTERSTORE" => -3, CommandFlags::WRITE, set::sinterstore,
    "SUNIONSTORE" => -3, CommandFlags::WRITE, set::sunionstore,

    // Sorted sets
    "ZADD" => -4, CommandFlags::WRITE, zset::zadd,
    "ZSCORE" => 3, CommandFlags::READONLY, zset::zscore,
    "ZREM" => -3, CommandFlags::WRITE, zset::zrem,
    "ZCARD" => 2, CommandFlags::READONLY, zset::zcard,
    "ZRANK" => 3, CommandFlags::READONLY, zset::zrank,
    "ZREVRANK" => 3, CommandFlags::READONLY, zset::zrevrank,
    "ZINCRBY" => 4, CommandFlags::WRITE, zset::zincrby,
    "ZRANGE" => -4, CommandFlags::READONLY, zset::zrange,
    "ZREVRANGE" => -4, CommandFlags::READONLY, zset::zrevrange,
    "ZRANGEBYSCORE" => -4, CommandFlags::READONLY, zset::zrangebyscore,
    "ZREVRANGEBYSCORE" => -4, CommandFlags::READONLY, zset::zrevrangebyscore,
    "ZCOUNT" => 4, CommandFlags::READONLY, zset::zcount,
    "ZREMRANGEBYRANK" => 4, CommandFlags::WRITE, zset::zremrangebyrank,
    "ZREMRANGEBYSCORE" => 4, CommandFlags::WRITE, zset::zremrangebyscore,

    // Server
    "PING" => -1, CommandFlags::READONLY, server::ping,
};

static TABLE: Lazy<HashMap<&'static str, &'static CommandSpec>> = Lazy::new(|| {
    COMMANDS.iter().map(|c| (c.name, c)).collect()
});

pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    TABLE.get(name.to_ascii_uppercase().as_str()).copied()
}

/// Dispatches `argv` (argv[0] is the command name) against the table,
/// checking arity before invoking the handler.
pub fn dispatch(ctx: &CommandContext, argv: &[Bytes]) -> EngineResult<RespValue> {
    let Some(name) = argv.first() else {
        return Err(EngineError::Protocol("empty command".into()));
    };
    let name_str = String::from_utf8_lossy(name).to_ascii_uppercase();
    let Some(spec) = lookup(&name_str) else {
        return Err(EngineError::UnknownCommand(name_str));
    };
    if !arity_ok(spec.arity, argv.len()) {
        return Err(EngineError::WrongArity(name_str));
    }
    (spec.handler)(ctx, argv)
}

/// Whether a successfully-dispatched command should be propagated to the
/// AOF as-is.
pub fn is_write(name: &str) -> bool {
    lookup(name).is_some_and(|c| c.flags.contains(CommandFlags::WRITE))
}
