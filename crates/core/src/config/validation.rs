//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version`, `static_prefix` or `dynamic_prefix` is empty
    /// - the static and dynamic bucket names collide
    /// - `origin` is not an absolute http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - a timeout is below 100ms or above 5 minutes
    /// - a precache URL is not a site-relative path
    /// - a routing table has a blank entry
    /// - a static path or API prefix does not start with `/`
    /// - an image extension lacks its leading dot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }
        if self.static_prefix.trim().is_empty() {
            return Err(invalid("static_prefix", "must not be empty"));
        }
        if self.dynamic_prefix.trim().is_empty() {
            return Err(invalid("dynamic_prefix", "must not be empty"));
        }
        if self.static_cache_name() == self.dynamic_cache_name() {
            return Err(invalid("dynamic_prefix", "must differ from static_prefix"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            Ok(_) => return Err(invalid("origin", "must be an absolute http(s) URL")),
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        for (field, value) in [("timeout_ms", self.timeout_ms), ("analytics_timeout_ms", self.analytics_timeout_ms)] {
            if value < 100 {
                return Err(invalid(field, "must be at least 100ms"));
            }
            if value > 300_000 {
                return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if let Some(bad) = self.precache_urls.iter().find(|u| !u.starts_with('/')) {
            return Err(invalid("precache_urls", format!("{bad} is not a site-relative path")));
        }

        let routing = &self.routing;
        for (field, entries) in [
            ("routing.static_paths", &routing.static_paths),
            ("routing.font_hosts", &routing.font_hosts),
            ("routing.image_extensions", &routing.image_extensions),
            ("routing.api_prefixes", &routing.api_prefixes),
            ("routing.analytics_hosts", &routing.analytics_hosts),
        ] {
            // An empty substring or prefix matches every request.
            if entries.iter().any(|e| e.trim().is_empty()) {
                return Err(invalid(field, "entries must not be blank"));
            }
        }

        let path_tables = [("routing.static_paths", &routing.static_paths), ("routing.api_prefixes", &routing.api_prefixes)];
        for (field, paths) in path_tables {
            if let Some(bad) = paths.iter().find(|p| !p.starts_with('/')) {
                return Err(invalid(field, format!("{bad} must start with '/'")));
            }
        }

        if let Some(bad) = routing.image_extensions.iter().find(|e| !e.starts_with('.')) {
            return Err(invalid("routing.image_extensions", format!("{bad} must start with '.'")));
        }

        for url in &self.precache_urls {
            if !self.routing.static_paths.contains(url) {
                tracing::warn!(url = %url, "precached path is not a static path; it will be served network-first");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: " ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_colliding_bucket_names() {
        let config = AppConfig { dynamic_prefix: "static-cache".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "dynamic_prefix"));
    }

    #[test]
    fn test_validate_relative_origin() {
        let config = AppConfig { origin: "/not/absolute".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_non_http_origin() {
        let config = AppConfig { origin: "file:///srv/site".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_analytics_timeout_too_large() {
        let config = AppConfig { analytics_timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "analytics_timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_absolute_precache_url() {
        let config = AppConfig { precache_urls: vec!["https://cdn.example/app.js".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "precache_urls"));
    }

    #[test]
    fn test_validate_extension_without_dot() {
        let mut config = AppConfig::default();
        config.routing.image_extensions.push("png".into());
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "routing.image_extensions"));
    }

    fn invalid_field(config: &AppConfig) -> Option<String> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_blank_font_host() {
        let mut config = AppConfig::default();
        config.routing.font_hosts.push(String::new());
        assert_eq!(invalid_field(&config).as_deref(), Some("routing.font_hosts"));
    }

    #[test]
    fn test_validate_blank_analytics_host() {
        let mut config = AppConfig::default();
        config.routing.analytics_hosts = vec!["  ".into()];
        assert_eq!(invalid_field(&config).as_deref(), Some("routing.analytics_hosts"));
    }

    #[test]
    fn test_validate_blank_api_prefix() {
        let mut config = AppConfig::default();
        config.routing.api_prefixes.push(String::new());
        assert_eq!(invalid_field(&config).as_deref(), Some("routing.api_prefixes"));
    }

    #[test]
    fn test_validate_blank_static_path() {
        let mut config = AppConfig::default();
        config.routing.static_paths.push(" ".into());
        assert_eq!(invalid_field(&config).as_deref(), Some("routing.static_paths"));
    }

    #[test]
    fn test_validate_static_path_without_slash() {
        let mut config = AppConfig::default();
        config.routing.static_paths.push("index.html".into());
        assert_eq!(invalid_field(&config).as_deref(), Some("routing.static_paths"));
    }

    #[test]
    fn test_validate_api_prefix_without_slash() {
        let mut config = AppConfig::default();
        config.routing.api_prefixes = vec!["api/".into()];
        assert_eq!(invalid_field(&config).as_deref(), Some("routing.api_prefixes"));
    }

    #[test]
    fn test_validate_empty_tables_are_allowed() {
        let mut config = AppConfig::default();
        config.routing.font_hosts.clear();
        config.routing.analytics_hosts.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_precache_outside_static_paths_is_allowed() {
        let mut config = AppConfig::default();
        config.precache_urls.push("/static/js/main.js".into());
        assert!(config.validate().is_ok());
    }
}
