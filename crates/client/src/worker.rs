//! Fetch interception entry point.
//!
//! [`ServiceWorker`] ties the classifier, the strategies and the lifecycle
//! together. Classification and strategies return values rather than errors,
//! so every intercepted request ends with a response; requests the worker
//! declines are handed back as [`Intercept::Passthrough`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use swcache_core::{AppConfig, CacheStorage, Error};

use crate::fetch::{Fetcher, Request, Response, ResponseSource};
use crate::lifecycle::{ActivateReport, InstallReport, Lifecycle, WorkerState};
use crate::router::{Classification, IneligibleReason, Route, Router};
use crate::strategy::{CacheNames, StoreOutcome, StrategyExecutor, StrategyOutcome};

/// Messages a page can post to the active worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate the waiting worker without waiting for tabs to close.
    SkipWaiting,
    GetVersion,
}

impl WorkerMessage {
    /// Parse a `{"type": "..."}` payload.
    pub fn parse(payload: &str) -> Result<Self, Error> {
        serde_json::from_str(payload).map_err(|e| Error::InvalidInput(format!("unknown worker message: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum MessageReply {
    SkipWaiting { state: WorkerState },
    Version { version: String, state: WorkerState },
}

/// Why the worker left a request to default network handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassReason {
    Ineligible(IneligibleReason),
    /// The worker does not control clients yet.
    NotActive(WorkerState),
}

impl std::fmt::Display for PassReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassReason::Ineligible(reason) => write!(f, "{reason}"),
            PassReason::NotActive(state) => write!(f, "worker is {state}"),
        }
    }
}

/// Decision for one observed request.
#[derive(Debug, Clone)]
pub enum Intercept {
    Passthrough(PassReason),
    Responded { route: Route, outcome: StrategyOutcome },
}

/// Final answer for a request, intercepted or not.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub response: Response,
    pub source: ResponseSource,
    pub route: Option<Route>,
    pub store: StoreOutcome,
    pub passthrough: Option<PassReason>,
}

/// The cache router for one deployed version.
pub struct ServiceWorker {
    version: String,
    router: Router,
    executor: StrategyExecutor,
    lifecycle: Lifecycle,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn CacheStorage>,
}

impl ServiceWorker {
    pub fn new(config: &AppConfig, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let router = Router::from_config(config)?;
        let names = CacheNames::from_config(config);
        let executor = StrategyExecutor::new(storage.clone(), fetcher.clone(), names.clone());
        let lifecycle = Lifecycle::new(
            storage.clone(),
            fetcher.clone(),
            names,
            config.precache_urls.clone(),
            router.origin().clone(),
        );

        Ok(Self { version: config.version.clone(), router, executor, lifecycle, fetcher, storage })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn cache_names(&self) -> &CacheNames {
        self.executor.names()
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.state().await
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.activate().await
    }

    pub async fn post_message(&self, message: WorkerMessage) -> MessageReply {
        match message {
            WorkerMessage::SkipWaiting => {
                self.lifecycle.skip_waiting();
                MessageReply::SkipWaiting { state: self.state().await }
            }
            WorkerMessage::GetVersion => {
                MessageReply::Version { version: self.version.clone(), state: self.state().await }
            }
        }
    }

    /// Classify and, when eligible, answer from the assigned strategy.
    pub async fn handle_fetch(&self, request: &Request) -> Intercept {
        let state = self.state().await;
        if !state.can_intercept_fetch() {
            return Intercept::Passthrough(PassReason::NotActive(state));
        }

        match self.router.classify(request) {
            Classification::Ineligible(reason) => {
                tracing::trace!(url = %request.url(), %reason, "not intercepted");
                Intercept::Passthrough(PassReason::Ineligible(reason))
            }
            Classification::Eligible(route) => {
                tracing::debug!(
                    url = %request.url(),
                    kind = ?route.kind,
                    strategy = route.strategy.name(),
                    "intercepted"
                );
                let outcome = self.executor.execute(request, route.strategy).await;
                Intercept::Responded { route, outcome }
            }
        }
    }

    /// Always produce a response: intercepted, or straight from the network.
    pub async fn respond(&self, request: &Request) -> Delivered {
        match self.handle_fetch(request).await {
            Intercept::Responded { route, outcome } => Delivered {
                response: outcome.response,
                source: outcome.source,
                route: Some(route),
                store: outcome.store,
                passthrough: None,
            },
            Intercept::Passthrough(reason) => {
                let (response, source) = match self.fetcher.fetch(request).await {
                    Ok(response) => (response, ResponseSource::Network),
                    Err(e) => {
                        tracing::debug!(url = %request.url(), error = %e, "passthrough fetch failed");
                        (Response::network_error(), ResponseSource::Offline)
                    }
                };
                Delivered { response, source, route: None, store: StoreOutcome::Skipped, passthrough: Some(reason) }
            }
        }
    }
}
