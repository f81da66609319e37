//! sw_message tool implementation.
//!
//! Posts a `{"type": ...}` message to the worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{ServiceWorker, WorkerMessage};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type: "SKIP_WAITING" or "GET_VERSION".
    #[serde(rename = "type")]
    pub kind: String,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &ServiceWorker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    if params.kind.trim().is_empty() {
        return Err(ToolError::InvalidInput("type cannot be empty".into()).into());
    }

    let payload = serde_json::json!({ "type": params.kind.trim() }).to_string();
    let message = WorkerMessage::parse(&payload)?;
    let reply = worker.post_message(message).await;

    Ok(json_result(&reply)?)
}
