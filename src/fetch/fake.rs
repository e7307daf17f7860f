//! Scriptable in-memory fetcher for tests
//!
//! Outcomes are scripted per URL as a queue: each fetch pops the next
//! outcome, and the final one repeats. URLs with no script resolve as a
//! network failure, which keeps offline scenarios the default.

use async_trait::async_trait;
use bytes::Bytes;
use http::{StatusCode, Uri};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

use super::{Fetch, FetchError, WorkerRequest, WorkerResponse};

/// One scripted fetch outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    Respond(WorkerResponse),
    Fail,
}

/// In-memory `Fetch` implementation with per-URL scripts and a request log.
#[derive(Default)]
pub struct FakeFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    probe_ok: Mutex<HashSet<String>>,
    requests: Mutex<Vec<WorkerRequest>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome to the script queue for a URL.
    pub fn script(&self, url: &str, outcome: Scripted) {
        self.scripts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Script a 200 response with the given body.
    pub fn respond_ok(&self, url: &str, body: &str) {
        self.script(
            url,
            Scripted::Respond(WorkerResponse::ok(Bytes::copy_from_slice(body.as_bytes()))),
        );
    }

    /// Script a response with an arbitrary status.
    pub fn respond_status(&self, url: &str, status: StatusCode, body: &str) {
        self.script(
            url,
            Scripted::Respond(WorkerResponse::new(
                status,
                Bytes::copy_from_slice(body.as_bytes()),
            )),
        );
    }

    /// Script a network failure.
    pub fn fail(&self, url: &str) {
        self.script(url, Scripted::Fail);
    }

    /// Mark a URL as answering HEAD probes successfully.
    pub fn allow_probe(&self, url: &str) {
        self.probe_ok.lock().insert(url.to_string());
    }

    /// How many fetches were performed against a URL.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.to_string() == url)
            .count()
    }

    /// Full log of requests performed against a URL, in order.
    pub fn requests_for(&self, url: &str) -> Vec<WorkerRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.to_string() == url)
            .cloned()
            .collect()
    }

    fn next_outcome(&self, url: &str) -> Scripted {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Scripted::Fail),
            Some(queue) => queue.front().cloned().unwrap_or(Scripted::Fail),
            None => Scripted::Fail,
        }
    }
}

#[async_trait]
impl Fetch for FakeFetcher {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse, FetchError> {
        let url = request.url.to_string();
        self.requests.lock().push(request.clone());
        match self.next_outcome(&url) {
            Scripted::Respond(response) => Ok(response),
            Scripted::Fail => Err(FetchError::Network(format!("scripted failure for {}", url))),
        }
    }

    async fn probe(&self, url: &Uri) -> bool {
        self.probe_ok.lock().contains(&url.to_string())
    }
}
