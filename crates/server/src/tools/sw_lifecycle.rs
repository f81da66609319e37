//! sw_install and sw_activate tool implementations.
//!
//! Drive the worker through its lifecycle events and report what changed.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use swcache_client::ServiceWorker;

use super::json_result;

/// Run the install event: pre-warm the static bucket.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    Ok(json_result(&report)?)
}

/// Run the activate event: drop stale buckets and claim clients.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    tracing::debug!(deleted = report.deleted.len(), kept = report.kept.len(), "buckets after activate");
    Ok(json_result(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{text_of, worker};
    use swcache_core::{CacheEntry, CacheStorage};

    #[tokio::test]
    async fn test_install_reports_partial_precache() {
        let (worker, storage) =
            worker(&[("http://localhost:3000/", "home"), ("http://localhost:3000/index.html", "home")]);

        let result = install_impl(&worker).await.unwrap();
        let report: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();

        assert_eq!(report["cache_name"], "static-cache-v2");
        assert_eq!(report["cached"].as_array().unwrap().len(), 2);
        assert!(!report["failed"].as_array().unwrap().is_empty());
        assert_eq!(report["skip_waiting"], true);
        assert_eq!(storage.entries("static-cache-v2").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_activate_before_install_fails() {
        let (worker, _storage) = worker(&[]);
        let err = activate_impl(&worker).await.unwrap_err();
        assert_eq!(err.code.0, -32013);
        assert!(err.message.contains("from parsed"));
    }

    #[tokio::test]
    async fn test_activate_removes_old_versions() {
        let (worker, storage) = worker(&[]);
        for name in ["static-cache-v1", "dynamic-cache-v1"] {
            let entry = CacheEntry::new(name, "GET", "http://localhost:3000/", 200, vec![], b"old".to_vec());
            storage.put(&entry).await.unwrap();
        }

        install_impl(&worker).await.unwrap();
        let result = activate_impl(&worker).await.unwrap();
        let report: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();

        assert_eq!(report["deleted"], serde_json::json!(["dynamic-cache-v1", "static-cache-v1"]));
        assert_eq!(report["clients_claimed"], true);
        assert_eq!(storage.keys().await.unwrap(), vec!["static-cache-v2".to_string()]);
    }
}
