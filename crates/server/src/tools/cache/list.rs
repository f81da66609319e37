//! cache_list tool implementation.
//!
//! Lists every bucket with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::CacheNames;
use swcache_core::CacheStorage;

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketSummary {
    pub name: String,
    pub entries: usize,
    /// Whether the bucket belongs to the running version.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub caches: Vec<BucketSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(storage: &dyn CacheStorage, names: &CacheNames) -> Result<CallToolResult, McpError> {
    let allow_list = names.allow_list();
    let mut caches = Vec::new();

    for name in storage.keys().await? {
        let entries = storage.entries(&name).await?.len();
        let current = allow_list.contains(&name.as_str());
        caches.push(BucketSummary { name, entries, current });
    }

    Ok(json_result(&CacheListOutput { caches })?)
}
