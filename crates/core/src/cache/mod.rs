//! Versioned request/response buckets.
//!
//! This module provides the bucket store used by the cache router:
//!
//! - [`CacheStorage`], the seam strategies and the lifecycle manager talk to
//! - [`CacheDb`], a durable SQLite store with async access via tokio-rusqlite
//! - [`MemoryStorage`], an in-process store with the same contract
//! - Request identity keys using SHA-256 over method and URL
//! - Automatic schema migrations

pub mod buckets;
pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStorage;
pub use storage::{CacheEntry, CacheStorage};
