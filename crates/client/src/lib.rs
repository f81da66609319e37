//! Client code for swcache.
//!
//! This crate provides the network fetcher, request classification, caching
//! strategies and the worker lifecycle shared by the server.

pub mod fetch;
pub mod lifecycle;
pub mod router;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use reqwest::header::{self, HeaderMap};
pub use reqwest::{Method, StatusCode, Url};

pub use fetch::{FetchClient, FetchConfig, Fetcher, Request, Response, ResponseSource};
pub use lifecycle::{ActivateReport, InstallReport, Lifecycle, PrecacheFailure, WorkerState};
pub use router::{Classification, IneligibleReason, Route, RouteKind, Router};
pub use strategy::{Bucket, CacheNames, StoreOutcome, Strategy, StrategyExecutor, StrategyOutcome};
pub use worker::{Delivered, Intercept, MessageReply, PassReason, ServiceWorker, WorkerMessage};
