//! Responses handed back to the page, and their stored form.

use std::borrow::Cow;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use swcache_core::{CacheEntry, Error};

use super::Request;

/// Body of the synthetic response when neither network nor cache can answer.
pub const OFFLINE_BODY: &str = "Offline";

/// Body of the synthetic response when a network-only fetch fails.
pub const NETWORK_ERROR_BODY: &str = "Network error";

/// Where a response delivered to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Synthetic 503.
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::Offline => "offline",
        }
    }
}

/// A fully formed response. Cloning shares the body buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Plain-text 503 built locally.
    pub fn unavailable(text: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self::new(StatusCode::SERVICE_UNAVAILABLE, headers, Bytes::from_static(text.as_bytes()))
    }

    pub fn offline() -> Self {
        Self::unavailable(OFFLINE_BODY)
    }

    pub fn network_error() -> Self {
        Self::unavailable(NETWORK_ERROR_BODY)
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Snapshot for `cache_name`, keyed by the request identity.
    ///
    /// Header values that are not valid UTF-8 are not stored.
    pub fn to_entry(&self, cache_name: &str, request: &Request) -> CacheEntry {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        CacheEntry::new(
            cache_name,
            request.method().as_str(),
            request.url().as_str(),
            self.status.as_u16(),
            headers,
            self.body.to_vec(),
        )
    }

    /// Rebuild a response from a stored entry.
    pub fn from_entry(entry: &CacheEntry) -> Result<Self, Error> {
        let status = StatusCode::from_u16(entry.status)
            .map_err(|_| Error::CorruptEntry(format!("{}: status {}", entry.url, entry.status)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &entry.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::CorruptEntry(format!("{}: header name {name}", entry.url)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::CorruptEntry(format!("{}: header value for {name}", entry.url)))?;
            headers.append(name, value);
        }

        Ok(Self::new(status, headers, entry.body.clone()))
    }
}
