//! cache_get tool implementation.
//!
//! Retrieves the stored response for a GET request from one bucket.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::Url;
use swcache_client::fetch::resolve;
use swcache_core::{CacheStorage, Error};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Bucket name, e.g. "static-cache-v2".
    pub cache: String,

    /// Request URL, absolute or relative to the configured origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub cache: String,
    pub url: String,
    pub key: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub stored_at: String,
    pub body_bytes: usize,
    /// Body as text, lossily decoded.
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    storage: &dyn CacheStorage, origin: &Url, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    if params.cache.trim().is_empty() {
        return Err(ToolError::InvalidInput("cache cannot be empty".into()).into());
    }
    let url = resolve(&params.url, origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let entry = storage
        .match_request(&params.cache, "GET", url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} {url}", params.cache)))?;

    let output = CacheGetOutput {
        cache: entry.cache_name,
        url: entry.url,
        key: entry.key,
        status: entry.status,
        headers: entry.headers,
        stored_at: entry.stored_at,
        body_bytes: entry.body.len(),
        body: String::from_utf8_lossy(&entry.body).into_owned(),
    };

    Ok(json_result(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::text_of;
    use swcache_core::{CacheDb, CacheEntry};

    fn origin() -> Url {
        Url::parse("http://localhost:3000").unwrap()
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { cache: "static-cache-v2".into(), url: "/index.html".into() };

        let err = get_impl(&cache, &origin(), params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found_by_relative_url() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let entry = CacheEntry::new(
            "static-cache-v2",
            "GET",
            "http://localhost:3000/manifest.json",
            200,
            vec![("content-type".into(), "application/manifest+json".into())],
            br#"{"short_name":"Vending"}"#.to_vec(),
        );
        cache.put(&entry).await.unwrap();

        let params = CacheGetParams { cache: "static-cache-v2".into(), url: "/manifest.json".into() };
        let result = get_impl(&cache, &origin(), params).await.unwrap();
        let output: CacheGetOutput = serde_json::from_str(&text_of(&result)).unwrap();

        assert_eq!(output.status, 200);
        assert_eq!(output.key, entry.key);
        assert_eq!(output.body, r#"{"short_name":"Vending"}"#);
        assert_eq!(output.headers[0].0, "content-type");
    }

    #[tokio::test]
    async fn test_get_impl_other_bucket_misses() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let entry = CacheEntry::new("dynamic-cache-v2", "GET", "http://localhost:3000/api/products", 200, vec![], vec![]);
        cache.put(&entry).await.unwrap();

        let params = CacheGetParams { cache: "static-cache-v2".into(), url: "/api/products".into() };
        assert!(get_impl(&cache, &origin(), params).await.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_empty_cache_name() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { cache: " ".into(), url: "/".into() };

        let err = get_impl(&cache, &origin(), params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
