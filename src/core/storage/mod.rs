// src/core/storage/mod.rs

//! Storage layer: the value kinds, the FNV hashing shared by sharding and
//! locking, the multi-key lock manager, the sharded dictionary, and the
//! sorted-set skip list.

pub mod data_types;
pub mod db;
pub mod fnv;
pub mod lock;
pub mod zset;

pub use data_types::{StoredValue, Value, ValueKind};
pub use db::Db;
pub use lock::LockManager;
