//! In-memory bucket store.
//!
//! Same contract as the SQLite store, held in a `tokio::sync::RwLock`.
//! Used by tests and by hosts that do not need entries to survive a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::compute_request_key;
use super::storage::{CacheEntry, CacheStorage};
use crate::Error;

type Buckets = BTreeMap<String, HashMap<String, CacheEntry>>;

/// In-memory [`CacheStorage`] implementation.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    buckets: Arc<RwLock<Buckets>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn oldest_first(entries: &mut [CacheEntry]) {
    entries.sort_by(|a, b| a.stored_at.cmp(&b.stored_at).then_with(|| a.url.cmp(&b.url)));
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        buckets.entry(cache_name.to_string()).or_default();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, Error> {
        Ok(self.buckets.write().await.remove(cache_name).is_some())
    }

    async fn match_request(&self, cache_name: &str, method: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let key = compute_request_key(method, url);
        let buckets = self.buckets.read().await;
        Ok(buckets.get(cache_name).and_then(|bucket| bucket.get(&key)).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        entry.ensure_storable()?;
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(entry.cache_name.clone())
            .or_default()
            .insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn entries(&self, cache_name: &str) -> Result<Vec<CacheEntry>, Error> {
        let buckets = self.buckets.read().await;
        let mut entries: Vec<CacheEntry> = buckets
            .get(cache_name)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default();
        oldest_first(&mut entries);
        Ok(entries)
    }

    async fn trim(&self, cache_name: &str, max_entries: usize) -> Result<u64, Error> {
        let mut buckets = self.buckets.write().await;
        let Some(bucket) = buckets.get_mut(cache_name) else {
            return Ok(0);
        };
        if bucket.len() <= max_entries {
            return Ok(0);
        }

        let mut entries: Vec<CacheEntry> = bucket.values().cloned().collect();
        oldest_first(&mut entries);
        let to_delete = entries.len() - max_entries;
        for entry in entries.iter().take(to_delete) {
            bucket.remove(&entry.key);
        }
        Ok(to_delete as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(cache: &str, url: &str, body: &str) -> CacheEntry {
        CacheEntry::new(cache, "GET", url, 200, vec![], body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let store = MemoryStorage::new();
        let entry = make_entry("static-cache-v2", "http://localhost:3000/manifest.json", "{}");
        store.put(&entry).await.unwrap();

        let found = store
            .match_request("static-cache-v2", "GET", "http://localhost:3000/manifest.json")
            .await
            .unwrap();
        assert_eq!(found, Some(entry));
    }

    #[tokio::test]
    async fn test_put_twice_keeps_one_entry() {
        let store = MemoryStorage::new();
        store.put(&make_entry("dynamic-cache-v2", "http://localhost:3000/a", "1")).await.unwrap();
        store.put(&make_entry("dynamic-cache-v2", "http://localhost:3000/a", "2")).await.unwrap();

        let entries = store.entries("dynamic-cache-v2").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].body, b"2");
    }

    #[tokio::test]
    async fn test_delete_removes_bucket() {
        let store = MemoryStorage::new();
        store.open("static-cache-v1").await.unwrap();
        store.open("static-cache-v2").await.unwrap();

        assert!(store.delete("static-cache-v1").await.unwrap());
        assert_eq!(store.keys().await.unwrap(), vec!["static-cache-v2"]);
    }

    #[tokio::test]
    async fn test_trim_drops_oldest() {
        let store = MemoryStorage::new();
        let mut old = make_entry("dynamic-cache-v2", "http://localhost:3000/old.png", "o");
        old.stored_at = "2026-01-01T00:00:00+00:00".into();
        let mut new = make_entry("dynamic-cache-v2", "http://localhost:3000/new.png", "n");
        new.stored_at = "2026-02-01T00:00:00+00:00".into();
        store.put(&old).await.unwrap();
        store.put(&new).await.unwrap();

        assert_eq!(store.trim("dynamic-cache-v2", 1).await.unwrap(), 1);
        let remaining = store.entries("dynamic-cache-v2").await.unwrap();
        assert_eq!(remaining, vec![new]);
    }

    #[tokio::test]
    async fn test_trim_missing_bucket() {
        let store = MemoryStorage::new();
        assert_eq!(store.trim("nope", 0).await.unwrap(), 0);
    }
}
