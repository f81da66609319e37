//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Bucket storage with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheStorage, MemoryStorage};
pub use config::{AppConfig, ConfigError, RoutingConfig};
pub use error::Error;
