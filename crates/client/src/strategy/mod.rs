//! Fetch/cache strategies.
//!
//! ### Policies
//! - **Cache-first**: a bucket hit is returned without touching the network.
//!   A miss goes to the network; ok responses are stored, failures become a
//!   synthetic 503 `Offline`.
//! - **Network-first**: the network answers when it can; ok responses are
//!   stored. A failed fetch falls back to the bucket, then to 503 `Offline`.
//! - **Network-only**: the network under a hard deadline, nothing stored,
//!   failures become 503 `Network error`.
//!
//! ### Guarantees
//! - Every call yields a fully formed [`Response`]; no error escapes.
//! - Storing is advisory: the outcome is reported in [`StoreOutcome`] and
//!   logged, but never changes the response.
//! - Lookup failures are treated as misses.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use swcache_core::{AppConfig, CacheStorage, Error};

use crate::fetch::{Fetcher, Request, Response, ResponseSource};

/// Which of the two versioned buckets a route writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Static,
    Dynamic,
}

/// Fetch/cache policy assigned to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheFirst(Bucket),
    NetworkFirst(Bucket),
    NetworkOnly { timeout: Duration },
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::CacheFirst(_) => "cache-first",
            Strategy::NetworkFirst(_) => "network-first",
            Strategy::NetworkOnly { .. } => "network-only",
        }
    }

    pub fn bucket(&self) -> Option<Bucket> {
        match self {
            Strategy::CacheFirst(bucket) | Strategy::NetworkFirst(bucket) => Some(*bucket),
            Strategy::NetworkOnly { .. } => None,
        }
    }
}

/// Bucket names for one deployed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub static_name: String,
    pub dynamic_name: String,
}

impl CacheNames {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { static_name: config.static_cache_name(), dynamic_name: config.dynamic_cache_name() }
    }

    pub fn resolve(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Static => &self.static_name,
            Bucket::Dynamic => &self.dynamic_name,
        }
    }

    /// Buckets kept by activate.
    pub fn allow_list(&self) -> [&str; 2] {
        [&self.static_name, &self.dynamic_name]
    }
}

/// What happened to the opportunistic bucket write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum StoreOutcome {
    Stored { cache_name: String },
    /// No write was due (cache hit, non-ok status, network-only, fallback).
    Skipped,
    Failed { cache_name: String, reason: String },
}

/// Result of running a strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub response: Response,
    pub source: ResponseSource,
    pub store: StoreOutcome,
}

impl StrategyOutcome {
    fn from_cache(response: Response) -> Self {
        Self { response, source: ResponseSource::Cache, store: StoreOutcome::Skipped }
    }

    fn from_network(response: Response, store: StoreOutcome) -> Self {
        Self { response, source: ResponseSource::Network, store }
    }

    fn unavailable(response: Response) -> Self {
        Self { response, source: ResponseSource::Offline, store: StoreOutcome::Skipped }
    }
}

/// Runs strategies against an injected bucket store and fetcher.
#[derive(Clone)]
pub struct StrategyExecutor {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    names: CacheNames,
}

impl StrategyExecutor {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, names: CacheNames) -> Self {
        Self { storage, fetcher, names }
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    pub async fn execute(&self, request: &Request, strategy: Strategy) -> StrategyOutcome {
        match strategy {
            Strategy::CacheFirst(bucket) => self.cache_first(request, bucket).await,
            Strategy::NetworkFirst(bucket) => self.network_first(request, bucket).await,
            Strategy::NetworkOnly { timeout } => self.network_only(request, timeout).await,
        }
    }

    pub async fn cache_first(&self, request: &Request, bucket: Bucket) -> StrategyOutcome {
        let cache_name = self.names.resolve(bucket);

        if let Some(cached) = self.lookup(cache_name, request).await {
            tracing::debug!(url = %request.url(), cache = cache_name, "cache hit");
            return StrategyOutcome::from_cache(cached);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                let store = self.store(cache_name, request, &response).await;
                StrategyOutcome::from_network(response, store)
            }
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "cache miss and network failed");
                StrategyOutcome::unavailable(Response::offline())
            }
        }
    }

    pub async fn network_first(&self, request: &Request, bucket: Bucket) -> StrategyOutcome {
        let cache_name = self.names.resolve(bucket);

        match self.fetcher.fetch(request).await {
            Ok(response) if response.is_ok() => {
                let store = self.store(cache_name, request, &response).await;
                StrategyOutcome::from_network(response, store)
            }
            Ok(response) => {
                if let Some(cached) = self.lookup(cache_name, request).await {
                    tracing::debug!(url = %request.url(), status = response.status.as_u16(), "serving cached copy");
                    return StrategyOutcome::from_cache(cached);
                }
                StrategyOutcome::from_network(response, StoreOutcome::Skipped)
            }
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "network failed, trying cache");
                match self.lookup(cache_name, request).await {
                    Some(cached) => StrategyOutcome::from_cache(cached),
                    None => StrategyOutcome::unavailable(Response::offline()),
                }
            }
        }
    }

    pub async fn network_only(&self, request: &Request, timeout: Duration) -> StrategyOutcome {
        let result = match tokio::time::timeout(timeout, self.fetcher.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url(), timeout.as_millis()))),
        };

        match result {
            Ok(response) => StrategyOutcome::from_network(response, StoreOutcome::Skipped),
            Err(e) => {
                tracing::debug!(url = %request.url(), error = %e, "network-only request failed");
                StrategyOutcome::unavailable(Response::network_error())
            }
        }
    }

    async fn lookup(&self, cache_name: &str, request: &Request) -> Option<Response> {
        let entry = match self
            .storage
            .match_request(cache_name, request.method().as_str(), request.url().as_str())
            .await
        {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::warn!(cache = cache_name, url = %request.url(), error = %e, "cache lookup failed");
                return None;
            }
        };

        match Response::from_entry(&entry) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(cache = cache_name, url = %request.url(), error = %e, "ignoring unreadable entry");
                None
            }
        }
    }

    async fn store(&self, cache_name: &str, request: &Request, response: &Response) -> StoreOutcome {
        if !response.is_ok() {
            return StoreOutcome::Skipped;
        }

        // Store a clone; the caller keeps the original.
        let entry = response.clone().to_entry(cache_name, request);
        match self.storage.put(&entry).await {
            Ok(()) => StoreOutcome::Stored { cache_name: cache_name.to_string() },
            Err(e) => {
                tracing::warn!(cache = cache_name, url = %request.url(), error = %e, "failed to store response");
                StoreOutcome::Failed { cache_name: cache_name.to_string(), reason: e.to_string() }
            }
        }
    }
}
