//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version tag appended to every bucket name.
    ///
    /// Changing it orphans all previously stored buckets; they are deleted on
    /// the next activate.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix of the bucket holding precached and static assets.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Prefix of the bucket filled at runtime.
    #[serde(default = "default_dynamic_prefix")]
    pub dynamic_prefix: String,

    /// Site origin used to resolve relative request paths.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite bucket database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Hard deadline for analytics requests in milliseconds.
    #[serde(default = "default_analytics_timeout_ms")]
    pub analytics_timeout_ms: u64,

    /// Site-relative paths fetched into the static bucket at install.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Classification tables.
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Tables the request classifier is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Exact paths served cache-first from the static bucket.
    #[serde(default = "default_static_paths")]
    pub static_paths: Vec<String>,

    /// Hostname substrings identifying font CDNs.
    #[serde(default = "default_font_hosts")]
    pub font_hosts: Vec<String>,

    /// Path extensions (with leading dot) treated as images.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Path prefixes of API calls.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Hostname substrings of third-party analytics endpoints.
    #[serde(default = "default_analytics_hosts")]
    pub analytics_hosts: Vec<String>,
}

fn default_version() -> String {
    "v2".into()
}

fn default_static_prefix() -> String {
    "static-cache".into()
}

fn default_dynamic_prefix() -> String {
    "dynamic-cache".into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_analytics_timeout_ms() -> u64 {
    10_000
}

fn default_precache_urls() -> Vec<String> {
    default_static_paths()
}

fn default_static_paths() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/favicon.ico", "/logo192.png", "/logo512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_font_hosts() -> Vec<String> {
    vec!["fonts.googleapis.com".into(), "fonts.gstatic.com".into()]
}

fn default_image_extensions() -> Vec<String> {
    [".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".avif"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_analytics_hosts() -> Vec<String> {
    vec!["google-analytics.com".into(), "googletagmanager.com".into()]
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            static_paths: default_static_paths(),
            font_hosts: default_font_hosts(),
            image_extensions: default_image_extensions(),
            api_prefixes: default_api_prefixes(),
            analytics_hosts: default_analytics_hosts(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            static_prefix: default_static_prefix(),
            dynamic_prefix: default_dynamic_prefix(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            analytics_timeout_ms: default_analytics_timeout_ms(),
            precache_urls: default_precache_urls(),
            routing: RoutingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Analytics deadline as Duration.
    pub fn analytics_timeout(&self) -> Duration {
        Duration::from_millis(self.analytics_timeout_ms)
    }

    /// Name of the static bucket for this version, e.g. `static-cache-v2`.
    pub fn static_cache_name(&self) -> String {
        format!("{}-{}", self.static_prefix, self.version)
    }

    /// Name of the dynamic bucket for this version, e.g. `dynamic-cache-v2`.
    pub fn dynamic_cache_name(&self) -> String {
        format!("{}-{}", self.dynamic_prefix, self.version)
    }

    /// Bucket names that survive activate.
    pub fn allow_list(&self) -> Vec<String> {
        vec![self.static_cache_name(), self.dynamic_cache_name()]
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
