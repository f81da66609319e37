//! cache_purge tool implementation.
//!
//! Deletes a whole bucket, or trims it to its newest N entries.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::CacheStorage;

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Bucket to purge.
    pub cache: String,

    /// Keep only the newest N entries (LRU purge). Without it the bucket is deleted.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub cache: String,

    /// Number of entries deleted by a trim.
    pub deleted: u64,

    /// Whether the bucket itself was removed.
    pub bucket_deleted: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(storage: &dyn CacheStorage, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.cache.trim().is_empty() {
        return Err(ToolError::InvalidInput("cache cannot be empty".into()).into());
    }

    let output = match params.max_entries {
        Some(max_entries) => {
            let deleted = storage.trim(&params.cache, max_entries).await?;
            CachePurgeOutput { cache: params.cache, deleted, bucket_deleted: false }
        }
        None => {
            let deleted = storage.entries(&params.cache).await?.len() as u64;
            let bucket_deleted = storage.delete(&params.cache).await?;
            CachePurgeOutput { cache: params.cache, deleted, bucket_deleted }
        }
    };

    tracing::info!(cache = %output.cache, deleted = output.deleted, bucket_deleted = output.bucket_deleted, "purged");
    Ok(json_result(&output)?)
}
