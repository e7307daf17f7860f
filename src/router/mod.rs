//! Route classifier
//!
//! Maps an incoming request to a caching strategy and a partition role via an
//! ordered rule table; the first matching rule wins. Non-GET requests and
//! non-http(s) schemes are never intercepted. Without a trailing catch-all
//! rule, unmatched URLs simply pass through to the network.

use http::{Method, Uri};
use regex::Regex;

use crate::partition::PartitionRole;

/// Strategy identifier carried by a route rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
    NetworkOnly,
    CacheOnly,
}

/// URL pattern of a route rule, evaluated against the request path.
#[derive(Debug, Clone)]
pub enum RoutePattern {
    /// Path starts with the given prefix
    PathPrefix(String),
    /// Path matches the given regex
    PathRegex(Regex),
    /// Matches any path; the table's catch-all
    Any,
}

impl RoutePattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            RoutePattern::PathPrefix(prefix) => path.starts_with(prefix.as_str()),
            RoutePattern::PathRegex(regex) => regex.is_match(path),
            RoutePattern::Any => true,
        }
    }
}

/// One ordered rule: pattern, strategy, partition role.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub pattern: RoutePattern,
    pub strategy: StrategyKind,
    pub role: PartitionRole,
}

/// Classification result for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub strategy: StrategyKind,
    pub role: PartitionRole,
}

/// Ordered, first-match-wins rule table.
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

/// File extensions served stale-while-revalidate from the static partition.
const STATIC_ASSET_PATTERN: &str =
    r"\.(?:js|mjs|css|map|woff2?|ttf|otf|png|jpe?g|gif|svg|ico|webp|avif)$";

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// The production rule set:
    /// model assets → cache-first, API → network-first, static file
    /// extensions → stale-while-revalidate, everything else (including
    /// navigations) → network-first against the dynamic partition.
    pub fn default_rules() -> Self {
        let static_assets =
            Regex::new(STATIC_ASSET_PATTERN).expect("static asset pattern is a valid regex");
        Self::new(vec![
            RouteRule {
                pattern: RoutePattern::PathPrefix("/models/".to_string()),
                strategy: StrategyKind::CacheFirst,
                role: PartitionRole::Models,
            },
            RouteRule {
                pattern: RoutePattern::PathPrefix("/api/".to_string()),
                strategy: StrategyKind::NetworkFirst,
                role: PartitionRole::Api,
            },
            RouteRule {
                pattern: RoutePattern::PathRegex(static_assets),
                strategy: StrategyKind::StaleWhileRevalidate,
                role: PartitionRole::Static,
            },
            RouteRule {
                pattern: RoutePattern::Any,
                strategy: StrategyKind::NetworkFirst,
                role: PartitionRole::Dynamic,
            },
        ])
    }

    /// Classify a request. Returns `None` when the proxy must not intercept:
    /// non-GET methods, non-http(s) schemes, or no matching rule.
    pub fn classify(&self, method: &Method, url: &Uri) -> Option<Route> {
        if *method != Method::GET {
            return None;
        }
        match url.scheme_str() {
            // Relative URLs are same-origin http(s).
            None | Some("http") | Some("https") => {}
            Some(_) => return None,
        }
        let path = url.path();
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| Route {
                strategy: rule.strategy,
                role: rule.role,
            })
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::default_rules()
    }
}
