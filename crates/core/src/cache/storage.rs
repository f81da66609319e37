//! The bucket store seam.
//!
//! Strategies and the lifecycle manager only see [`CacheStorage`]; the
//! SQLite-backed [`CacheDb`](super::CacheDb) is used in production and
//! [`MemoryStorage`](super::MemoryStorage) in tests.

use async_trait::async_trait;

use super::hash::compute_request_key;
use crate::Error;

/// A stored response for one request identity in one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub cache_name: String,
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CacheEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        cache_name: impl Into<String>, method: &str, url: &str, status: u16, headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            key: compute_request_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Only GET responses may be stored.
    pub fn ensure_storable(&self) -> Result<(), Error> {
        if self.method != "GET" {
            return Err(Error::InvalidInput(format!("cannot store {} {}: only GET is cacheable", self.method, self.url)));
        }
        if self.cache_name.is_empty() {
            return Err(Error::InvalidInput("cache name cannot be empty".into()));
        }
        Ok(())
    }
}

/// Named, durable request → response buckets.
///
/// Each call is atomic from the caller's perspective; no guarantee spans
/// several calls.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the bucket if it does not exist.
    async fn open(&self, cache_name: &str) -> Result<(), Error>;

    /// Names of all existing buckets, sorted.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a bucket and all of its entries. Returns whether it existed.
    async fn delete(&self, cache_name: &str) -> Result<bool, Error>;

    /// Look up the entry for `(method, url)` in a bucket.
    async fn match_request(&self, cache_name: &str, method: &str, url: &str) -> Result<Option<CacheEntry>, Error>;

    /// Insert or replace the entry for the entry's identity, opening the
    /// bucket first if needed.
    async fn put(&self, entry: &CacheEntry) -> Result<(), Error>;

    /// All entries of a bucket, oldest first.
    async fn entries(&self, cache_name: &str) -> Result<Vec<CacheEntry>, Error>;

    /// Drop the oldest entries of a bucket until at most `max_entries` remain.
    ///
    /// Returns the number of deleted entries.
    async fn trim(&self, cache_name: &str, max_entries: usize) -> Result<u64, Error>;
}
