//! Request classification.
//!
//! Rules are kept as an explicit ordered list and evaluated top to bottom;
//! the first match wins. Requests that are not GET over http(s), or whose
//! URL cannot be parsed, are ineligible and must not be intercepted.

use std::time::Duration;

use reqwest::{Method, Url};
use serde::Serialize;
use swcache_core::{AppConfig, Error, RoutingConfig};

use crate::fetch::{Request, is_http};
use crate::strategy::{Bucket, Strategy};

/// Which rule assigned the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Static,
    Font,
    Image,
    Analytics,
    Api,
    Default,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Static => "static",
            RouteKind::Font => "font",
            RouteKind::Image => "image",
            RouteKind::Analytics => "analytics",
            RouteKind::Api => "api",
            RouteKind::Default => "default",
        }
    }
}

/// Strategy assignment for an eligible request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub kind: RouteKind,
    pub strategy: Strategy,
}

/// Why a request is left to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IneligibleReason {
    Method(String),
    Scheme(String),
    MalformedUrl(String),
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IneligibleReason::Method(method) => write!(f, "method {method} is not cached"),
            IneligibleReason::Scheme(scheme) => write!(f, "scheme {scheme} is not cached"),
            IneligibleReason::MalformedUrl(msg) => write!(f, "malformed URL: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ineligible(IneligibleReason),
    Eligible(Route),
}

/// Predicate of one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Path equals one of the entries.
    ExactPath(Vec<String>),
    /// Hostname contains one of the substrings.
    HostContains(Vec<String>),
    /// Extension of the last path segment is in the list.
    PathExtension(Vec<String>),
    /// Path starts with one of the prefixes.
    PathPrefix(Vec<String>),
}

impl Matcher {
    pub fn matches(&self, url: &Url) -> bool {
        match self {
            Matcher::ExactPath(paths) => paths.iter().any(|p| p == url.path()),
            Matcher::HostContains(hosts) => {
                let host = url.host_str().unwrap_or_default();
                hosts.iter().any(|h| host.contains(h.as_str()))
            }
            Matcher::PathExtension(extensions) => match path_extension(url.path()) {
                Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
                None => false,
            },
            Matcher::PathPrefix(prefixes) => prefixes.iter().any(|p| url.path().starts_with(p.as_str())),
        }
    }
}

/// `.png` for `/img/machine.PNG`, None for `/about`.
fn path_extension(path: &str) -> Option<&str> {
    let segment = path.rsplit('/').next()?;
    let dot = segment.rfind('.')?;
    Some(&segment[dot..])
}

/// One entry of the ordered rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub matcher: Matcher,
    pub route: Route,
}

/// Ordered classifier built from the routing tables.
#[derive(Debug, Clone)]
pub struct Router {
    origin: Url,
    rules: Vec<Rule>,
    fallback: Route,
}

impl Router {
    pub fn new(routing: &RoutingConfig, analytics_timeout: Duration, origin: Url) -> Self {
        let rule = |matcher, kind, strategy| Rule { matcher, route: Route { kind, strategy } };
        let rules = vec![
            rule(
                Matcher::ExactPath(routing.static_paths.clone()),
                RouteKind::Static,
                Strategy::CacheFirst(Bucket::Static),
            ),
            rule(
                Matcher::HostContains(routing.font_hosts.clone()),
                RouteKind::Font,
                Strategy::CacheFirst(Bucket::Static),
            ),
            rule(
                Matcher::PathExtension(routing.image_extensions.clone()),
                RouteKind::Image,
                Strategy::CacheFirst(Bucket::Dynamic),
            ),
            rule(
                Matcher::HostContains(routing.analytics_hosts.clone()),
                RouteKind::Analytics,
                Strategy::NetworkOnly { timeout: analytics_timeout },
            ),
            rule(
                Matcher::PathPrefix(routing.api_prefixes.clone()),
                RouteKind::Api,
                Strategy::NetworkFirst(Bucket::Dynamic),
            ),
        ];

        let fallback = Route { kind: RouteKind::Default, strategy: Strategy::NetworkFirst(Bucket::Dynamic) };

        Self { origin, rules, fallback }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        Ok(Self::new(&config.routing, config.analytics_timeout(), origin))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Classify an intercepted request.
    pub fn classify(&self, request: &Request) -> Classification {
        if request.method() != Method::GET {
            return Classification::Ineligible(IneligibleReason::Method(request.method().to_string()));
        }
        if !is_http(request.url()) {
            return Classification::Ineligible(IneligibleReason::Scheme(request.url().scheme().to_string()));
        }

        let route = self
            .rules
            .iter()
            .find(|rule| rule.matcher.matches(request.url()))
            .map(|rule| rule.route)
            .unwrap_or(self.fallback);
        Classification::Eligible(route)
    }

    /// Classify from raw method and URL text, normalised like [`Request::parse`].
    /// Unparsable URLs and methods are ineligible.
    pub fn classify_raw(&self, method: &str, url: &str) -> Classification {
        match Request::parse(method, url, &self.origin) {
            Ok(request) => self.classify(&request),
            Err(Error::InvalidUrl(msg)) => Classification::Ineligible(IneligibleReason::MalformedUrl(msg)),
            Err(_) => Classification::Ineligible(IneligibleReason::Method(method.trim().to_string())),
        }
    }
}
