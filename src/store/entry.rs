//! Request identity and stored response types
//!
//! `RequestKey` identifies a cached entry within a partition (method + URL,
//! query string included). `StoredResponse` is the durable record of the most
//! recently stored response for that key. Entries never expire by time; they
//! only disappear when their whole partition is deleted on version rollover.

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::fetch::WorkerResponse;

/// Request identity: method plus absolute URL, query included.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: impl Into<String>) -> Self {
        Self {
            method: method.as_str().to_string(),
            url: url.into(),
        }
    }

    /// Shorthand for the common GET key.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
        }
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A cached response: status, headers and body bytes, plus the time it was
/// written (informational only, no TTL is derived from it).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: SystemTime,
}

impl StoredResponse {
    /// Rebuild a live response from the stored record.
    pub fn to_response(&self) -> WorkerResponse {
        WorkerResponse {
            status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

impl From<&WorkerResponse> for StoredResponse {
    fn from(response: &WorkerResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            headers: response.headers.clone(),
            body: response.body.clone(),
            stored_at: SystemTime::now(),
        }
    }
}
