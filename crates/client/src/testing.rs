//! Scripted fakes for the fetcher and bucket store seams.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use swcache_core::{CacheEntry, CacheStorage, Error, MemoryStorage};
use tokio::sync::Mutex;

use crate::fetch::{Fetcher, Request, Response};

#[derive(Clone)]
enum Reply {
    Status(u16, &'static str),
    Fail,
    Hang,
}

/// Answers by URL; unknown URLs fail like an unplugged network.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn respond(&self, url: &str, status: u16, body: &'static str) {
        self.replies.lock().await.insert(url.to_string(), Reply::Status(status, body));
    }

    pub async fn fail(&self, url: &str) {
        self.replies.lock().await.insert(url.to_string(), Reply::Fail);
    }

    pub async fn hang(&self, url: &str) {
        self.replies.lock().await.insert(url.to_string(), Reply::Hang);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().await.get(request.url().as_str()).cloned();
        match reply {
            Some(Reply::Status(status, body)) => Ok(Response::new(
                StatusCode::from_u16(status).map_err(|e| Error::Network(e.to_string()))?,
                HeaderMap::new(),
                body,
            )),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::Network("hung".into()))
            }
            Some(Reply::Fail) | None => Err(Error::Network(format!("connection refused: {}", request.url()))),
        }
    }
}

/// Reads like the in-memory store, every write fails.
#[derive(Clone, Default)]
pub struct ReadOnlyStorage {
    pub inner: MemoryStorage,
}

#[async_trait]
impl CacheStorage for ReadOnlyStorage {
    async fn open(&self, _cache_name: &str) -> Result<(), Error> {
        Err(Error::InvalidInput("quota exceeded".into()))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, _cache_name: &str) -> Result<bool, Error> {
        Err(Error::InvalidInput("quota exceeded".into()))
    }

    async fn match_request(&self, cache_name: &str, method: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        self.inner.match_request(cache_name, method, url).await
    }

    async fn put(&self, _entry: &CacheEntry) -> Result<(), Error> {
        Err(Error::InvalidInput("quota exceeded".into()))
    }

    async fn entries(&self, cache_name: &str) -> Result<Vec<CacheEntry>, Error> {
        self.inner.entries(cache_name).await
    }

    async fn trim(&self, _cache_name: &str, _max_entries: usize) -> Result<u64, Error> {
        Err(Error::InvalidInput("quota exceeded".into()))
    }
}
