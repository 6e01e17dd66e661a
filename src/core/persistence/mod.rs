// src/core/persistence/mod.rs

pub mod aof;

pub use aof::{Aof, AofHandle};
