//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::error::ToolError;

pub mod cache;
pub mod sw_fetch;
pub mod sw_lifecycle;
pub mod sw_message;

/// Pretty JSON text content, the shape every tool returns.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, ToolError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::Output(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use swcache_client::{Fetcher, HeaderMap, Request, Response, ServiceWorker, StatusCode};
    use swcache_core::{AppConfig, CacheStorage, Error, MemoryStorage};

    /// Fixed URL → body table; anything else fails like a dropped connection.
    #[derive(Default)]
    pub struct TableFetcher {
        pub pages: HashMap<String, &'static str>,
    }

    #[async_trait]
    impl Fetcher for TableFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            match self.pages.get(request.url().as_str()) {
                Some(body) => Ok(Response::new(StatusCode::OK, HeaderMap::new(), *body)),
                None => Err(Error::Network(format!("offline: {}", request.url()))),
            }
        }
    }

    pub fn worker(pages: &[(&str, &'static str)]) -> (ServiceWorker, MemoryStorage) {
        let storage = MemoryStorage::new();
        let fetcher = TableFetcher { pages: pages.iter().map(|(url, body)| (url.to_string(), *body)).collect() };
        let storage_seam: Arc<dyn CacheStorage> = Arc::new(storage.clone());
        let worker = ServiceWorker::new(&AppConfig::default(), storage_seam, Arc::new(fetcher)).unwrap();
        (worker, storage)
    }

    pub fn text_of(result: &CallToolResult) -> String {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content")
            .to_string()
    }
}
