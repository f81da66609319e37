//! Install / activate lifecycle.
//!
//! `parsed → installing → installed → activating → activated`
//!
//! Install pre-warms the static bucket and asks to skip waiting. Activate
//! deletes every bucket outside the allow-list and claims open clients.
//! Failures inside either step are logged and reported, never fatal: the
//! worker always reaches the next state.
//!
//! There is no previous worker holding clients, so nothing waits on the
//! skip-waiting flag. It is recorded and reported only; activation order is
//! enforced by state alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Url;
use serde::Serialize;
use swcache_core::{CacheStorage, Error};
use tokio::sync::RwLock;

use crate::fetch::{Fetcher, Request, resolve};
use crate::strategy::CacheNames;

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl WorkerState {
    /// Only an active worker intercepts fetches.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
    pub errors: Vec<String>,
    pub clients_claimed: bool,
}

/// Drives install and activate against the bucket store.
pub struct Lifecycle {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    names: CacheNames,
    precache: Vec<String>,
    origin: Url,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl Lifecycle {
    pub fn new(
        storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, names: CacheNames, precache: Vec<String>,
        origin: Url,
    ) -> Self {
        Self {
            storage,
            fetcher,
            names,
            precache,
            origin,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn is_skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Become eligible for activation without waiting for open clients to close.
    pub fn skip_waiting(&self) {
        if !self.skip_waiting.swap(true, Ordering::SeqCst) {
            tracing::info!("skip waiting requested");
        }
    }

    /// Move from `expected` to `next`, or fail without changing state.
    async fn transition(&self, expected: WorkerState, next: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != expected {
            return Err(Error::Lifecycle(format!("cannot enter {next} from {}", *state)));
        }
        *state = next;
        Ok(())
    }

    async fn set_state(&self, next: WorkerState) {
        *self.state.write().await = next;
        tracing::info!(state = %next, "worker state changed");
    }

    /// Pre-warm the static bucket.
    ///
    /// Individual resources that fail are reported in the returned
    /// [`InstallReport`]; the worker still reaches `installed`.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;

        let cache_name = self.names.static_name.clone();
        let mut report =
            InstallReport { cache_name: cache_name.clone(), cached: Vec::new(), failed: Vec::new(), skip_waiting: false };

        if let Err(e) = self.storage.open(&cache_name).await {
            tracing::warn!(cache = %cache_name, error = %e, "failed to open static bucket");
        }

        for path in &self.precache {
            match self.precache_one(&cache_name, path).await {
                Ok(()) => report.cached.push(path.clone()),
                Err(e) => {
                    tracing::warn!(url = %path, error = %e, "precache failed");
                    report.failed.push(PrecacheFailure { url: path.clone(), reason: e.to_string() });
                }
            }
        }

        self.set_state(WorkerState::Installed).await;
        self.skip_waiting();
        report.skip_waiting = self.is_skip_waiting();

        tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "install finished");
        Ok(report)
    }

    async fn precache_one(&self, cache_name: &str, path: &str) -> Result<(), Error> {
        let url = resolve(path, &self.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let request = Request::get(url);
        let response = self.fetcher.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::Network(format!("status {}", response.status.as_u16())));
        }
        self.storage.put(&response.to_entry(cache_name, &request)).await
    }

    /// Delete stale buckets and claim clients.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;

        let allow_list = self.names.allow_list();
        let mut report =
            ActivateReport { deleted: Vec::new(), kept: Vec::new(), errors: Vec::new(), clients_claimed: false };

        match self.storage.keys().await {
            Ok(names) => {
                for name in names {
                    if allow_list.contains(&name.as_str()) {
                        report.kept.push(name);
                        continue;
                    }
                    match self.storage.delete(&name).await {
                        Ok(_) => {
                            tracing::info!(cache = %name, "deleted stale bucket");
                            report.deleted.push(name);
                        }
                        Err(e) => {
                            tracing::warn!(cache = %name, error = %e, "failed to delete stale bucket");
                            report.errors.push(format!("{name}: {e}"));
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to list buckets");
                report.errors.push(e.to_string());
            }
        }

        self.clients_claimed.store(true, Ordering::SeqCst);
        report.clients_claimed = true;
        self.set_state(WorkerState::Activated).await;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ReadOnlyStorage, ScriptedFetcher};
    use swcache_core::{AppConfig, CacheEntry, MemoryStorage};

    fn lifecycle(storage: Arc<dyn CacheStorage>, fetcher: &ScriptedFetcher, precache: &[&str]) -> Lifecycle {
        let config = AppConfig::default();
        Lifecycle::new(
            storage,
            Arc::new(fetcher.clone()),
            CacheNames::from_config(&config),
            precache.iter().map(|p| p.to_string()).collect(),
            Url::parse(&config.origin).unwrap(),
        )
    }

    #[test]
    fn test_only_activated_intercepts() {
        assert!(WorkerState::Activated.can_intercept_fetch());
        assert!(!WorkerState::Installed.can_intercept_fetch());
        assert_eq!(WorkerState::Activating.to_string(), "activating");
    }

    #[tokio::test]
    async fn test_install_precaches_into_static_bucket() {
        let storage = MemoryStorage::new();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("http://localhost:3000/", 200, "<html>").await;
        fetcher.respond("http://localhost:3000/manifest.json", 200, "{}").await;

        let lifecycle = lifecycle(Arc::new(storage.clone()), &fetcher, &["/", "/manifest.json"]);
        let report = lifecycle.install().await.unwrap();

        assert_eq!(report.cache_name, "static-cache-v2");
        assert_eq!(report.cached, vec!["/", "/manifest.json"]);
        assert!(report.failed.is_empty());
        assert!(report.skip_waiting);
        assert_eq!(lifecycle.state().await, WorkerState::Installed);
        assert_eq!(storage.entries("static-cache-v2").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_install_failure_is_swallowed() {
        let storage = MemoryStorage::new();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("http://localhost:3000/", 200, "<html>").await;
        fetcher.respond("http://localhost:3000/logo512.png", 404, "nope").await;

        let lifecycle = lifecycle(Arc::new(storage.clone()), &fetcher, &["/", "/logo512.png", "/favicon.ico"]);
        let report = lifecycle.install().await.unwrap();

        assert_eq!(report.cached, vec!["/"]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].url, "/logo512.png");
        assert_eq!(lifecycle.state().await, WorkerState::Installed);
        assert!(lifecycle.is_skip_waiting());
    }

    #[tokio::test]
    async fn test_install_with_failing_store_still_installs() {
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("http://localhost:3000/", 200, "<html>").await;

        let lifecycle = lifecycle(Arc::new(ReadOnlyStorage::default()), &fetcher, &["/"]);
        let report = lifecycle.install().await.unwrap();

        assert!(report.cached.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(lifecycle.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let fetcher = ScriptedFetcher::new();
        let lifecycle = lifecycle(Arc::new(MemoryStorage::new()), &fetcher, &[]);
        lifecycle.install().await.unwrap();
        assert!(matches!(lifecycle.install().await, Err(Error::Lifecycle(_))));
    }

    #[tokio::test]
    async fn test_skip_waiting_does_not_bypass_install() {
        let fetcher = ScriptedFetcher::new();
        let lifecycle = lifecycle(Arc::new(MemoryStorage::new()), &fetcher, &[]);

        lifecycle.skip_waiting();

        assert!(lifecycle.is_skip_waiting());
        assert_eq!(lifecycle.state().await, WorkerState::Parsed);
        assert!(matches!(lifecycle.activate().await, Err(Error::Lifecycle(_))));

        let report = lifecycle.install().await.unwrap();
        assert!(report.skip_waiting);
        assert!(lifecycle.activate().await.is_ok());
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let fetcher = ScriptedFetcher::new();
        let lifecycle = lifecycle(Arc::new(MemoryStorage::new()), &fetcher, &[]);
        assert!(matches!(lifecycle.activate().await, Err(Error::Lifecycle(_))));
        assert_eq!(lifecycle.state().await, WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_buckets() {
        let storage = MemoryStorage::new();
        for name in ["static-cache-v1", "dynamic-cache-v1", "static-cache-v2"] {
            storage.open(name).await.unwrap();
        }
        let fetcher = ScriptedFetcher::new();
        let lifecycle = lifecycle(Arc::new(storage.clone()), &fetcher, &[]);

        lifecycle.install().await.unwrap();
        let report = lifecycle.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["dynamic-cache-v1", "static-cache-v1"]);
        assert_eq!(report.kept, vec!["static-cache-v2"]);
        assert!(report.clients_claimed);
        assert_eq!(storage.keys().await.unwrap(), vec!["static-cache-v2"]);
        assert_eq!(lifecycle.state().await, WorkerState::Activated);
        assert!(lifecycle.clients_claimed());
    }

    #[tokio::test]
    async fn test_activate_errors_do_not_block() {
        let storage = ReadOnlyStorage::default();
        storage.inner.open("static-cache-v1").await.unwrap();
        let fetcher = ScriptedFetcher::new();
        let lifecycle = lifecycle(Arc::new(storage), &fetcher, &[]);

        lifecycle.install().await.unwrap();
        let report = lifecycle.activate().await.unwrap();

        assert_eq!(report.errors.len(), 1);
        assert!(report.deleted.is_empty());
        assert_eq!(lifecycle.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_precached_entries_survive_activate() {
        let storage = MemoryStorage::new();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("http://localhost:3000/index.html", 200, "<html>").await;
        let lifecycle = lifecycle(Arc::new(storage.clone()), &fetcher, &["/index.html"]);

        lifecycle.install().await.unwrap();
        lifecycle.activate().await.unwrap();

        let entry: Option<CacheEntry> = storage
            .match_request("static-cache-v2", "GET", "http://localhost:3000/index.html")
            .await
            .unwrap();
        assert!(entry.is_some());
    }
}
