//! Request/response model and the origin fetch abstraction
//!
//! The proxy treats page traffic as plain requests (method, URL, headers,
//! body) and responses (status, headers, body). The `Fetch` trait is the seam
//! between strategy code and the actual network: production uses the
//! reqwest-backed `HttpFetcher`, tests script a `FakeFetcher`.

pub mod client;
pub mod fake;

pub use client::HttpFetcher;
pub use fake::FakeFetcher;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode, Uri};
use thiserror::Error;

use crate::store::RequestKey;

/// A network request as seen by the proxy.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: Method,
    pub url: Uri,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// True for top-level page navigations. Network-first uses this to fall
    /// back to the cached root document when nothing else is available.
    pub navigation: bool,
}

impl WorkerRequest {
    pub fn get(url: Uri) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: Bytes::new(),
            navigation: false,
        }
    }

    pub fn navigation(url: Uri) -> Self {
        Self {
            navigation: true,
            ..Self::get(url)
        }
    }

    /// Request identity used as the cache key.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, self.url.to_string())
    }

    /// Key of the root document on the same origin, the last-resort fallback
    /// for failed navigations.
    pub fn root_key(&self) -> RequestKey {
        let root = match (self.url.scheme_str(), self.url.authority()) {
            (Some(scheme), Some(authority)) => format!("{}://{}/", scheme, authority),
            _ => "/".to_string(),
        };
        RequestKey::get(root)
    }
}

/// A response as delivered back to the page.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl WorkerResponse {
    pub fn new(status: StatusCode, body: Bytes) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn ok(body: Bytes) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Synthetic 503 returned when a strategy has no fallback left. The page
    /// renders its own offline UI from this instead of a hard network error.
    pub fn service_unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: Bytes::from_static(b"Service Unavailable"),
        }
    }

    /// Only successful (2xx/3xx) responses may be written to cache; anything
    /// else passes through to the caller without touching stored entries.
    pub fn is_cacheable(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }
}

/// Network fetch failure: offline, DNS, timeout, connection reset. A response
/// with an unsuccessful status is not a `FetchError`; it is a response.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// The origin fetch seam.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform the request against the origin.
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, FetchError>;

    /// HEAD-style existence probe. Used by install to skip optional assets
    /// that are not deployed.
    async fn probe(&self, url: &Uri) -> bool;
}
