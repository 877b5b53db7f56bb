//! Gramline Storage - Database and ephemeral counter store abstraction
//!
//! This crate provides the persistence layer for Gramline: the PostgreSQL
//! pool and entity repositories, plus the key-value abstraction over the
//! ephemeral counter store (locks, rate counters, cooldown markers).

pub mod db;
pub mod kv;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use kv::{KvStore, MemoryKv, RedisKv};
pub use models::*;
pub use repository::*;
