//! sw_fetch tool implementation.
//!
//! Presents one request to the worker as if a page had issued it and reports
//! the response together with how it was produced.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{Request, ServiceWorker, StoreOutcome, header};

use super::json_result;

/// Bodies longer than this are cut in the text preview.
const PREVIEW_CHARS: usize = 4096;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is ever intercepted.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub method: String,
    /// The resolved request URL.
    pub url: String,
    pub status: u16,
    /// "cache", "network" or "offline".
    pub source: String,
    /// Rule that matched, absent when the worker did not intercept.
    pub route: Option<String>,
    pub strategy: Option<String>,
    /// Why the request went straight to the network.
    pub passthrough: Option<String>,
    /// Bucket the response was written to.
    pub stored_in: Option<String>,
    pub store_error: Option<String>,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    pub body: String,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = Request::parse(&params.method, &params.url, worker.router().origin())?;
    let delivered = worker.respond(&request).await;

    let (stored_in, store_error) = match delivered.store {
        StoreOutcome::Stored { cache_name } => (Some(cache_name), None),
        StoreOutcome::Skipped => (None, None),
        StoreOutcome::Failed { cache_name, reason } => (None, Some(format!("{cache_name}: {reason}"))),
    };

    let content_type = delivered
        .response
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let output = SwFetchOutput {
        method: request.method().to_string(),
        url: request.url().to_string(),
        status: delivered.response.status.as_u16(),
        source: delivered.source.as_str().to_string(),
        route: delivered.route.map(|r| r.kind.as_str().to_string()),
        strategy: delivered.route.map(|r| r.strategy.name().to_string()),
        passthrough: delivered.passthrough.map(|p| p.to_string()),
        stored_in,
        store_error,
        content_type,
        body_bytes: delivered.response.body.len(),
        body: delivered.response.text().chars().take(PREVIEW_CHARS).collect(),
    };

    Ok(json_result(&output)?)
}
