//! Deferred mutation queue
//!
//! Mutating requests that could not reach the origin are staged by the
//! calling page into the offline-data partition (GET-only interception means
//! the proxy never captures them itself). A background-sync tag later drains
//! the URL-matched subset: each record is replayed independently against the
//! origin, deleted on success, left queued on failure.
//!
//! `plan_drain` is pure; `MutationQueue::drain` is the thin driver that
//! performs the replays and commits the results.

use http::{Method, Uri};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::WorkerConfig;
use crate::fetch::{Fetch, WorkerRequest};
use crate::partition::offline_data_partition;
use crate::store::{PartitionStore, RequestKey, StoreError, StoredResponse};

/// A durable record of a mutating request: method, URL, headers, body.
/// Not a live request object; it survives the page that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredMutation {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl DeferredMutation {
    pub fn new(
        method: &Method,
        url: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            method: method.as_str().to_string(),
            url: url.into(),
            headers,
            body,
        }
    }

    /// Request identity within the offline-data partition.
    pub fn key(&self) -> RequestKey {
        RequestKey {
            method: self.method.clone(),
            url: self.url.clone(),
        }
    }

    fn to_record(&self) -> Result<StoredResponse, StoreError> {
        Ok(StoredResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(self)?.into(),
            stored_at: SystemTime::now(),
        })
    }

    fn from_record(record: &StoredResponse) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(&record.body)?)
    }

    /// Rebuild the live request for replay.
    fn to_request(&self) -> Result<WorkerRequest, String> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|e| format!("invalid method {}: {}", self.method, e))?;
        let url: Uri = self
            .url
            .parse()
            .map_err(|e| format!("invalid URL {}: {}", self.url, e))?;
        Ok(WorkerRequest {
            method,
            url,
            headers: self.headers.clone(),
            body: self.body.clone().into(),
            navigation: false,
        })
    }

    fn targets(&self, endpoint: &str) -> bool {
        self.url
            .parse::<Uri>()
            .map(|u| u.path().starts_with(endpoint))
            .unwrap_or(false)
    }
}

/// One planned replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayAttempt {
    pub key: RequestKey,
    pub mutation: DeferredMutation,
}

/// Select the records whose URL matches the target endpoint. Pure function
/// over a partition snapshot; the driver applies the attempts.
pub fn plan_drain(
    endpoint: &str,
    snapshot: &[(RequestKey, DeferredMutation)],
) -> Vec<ReplayAttempt> {
    snapshot
        .iter()
        .filter(|(_, mutation)| mutation.targets(endpoint))
        .map(|(key, mutation)| ReplayAttempt {
            key: key.clone(),
            mutation: mutation.clone(),
        })
        .collect()
}

/// Outcome counts of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub replayed: usize,
    pub failed: usize,
}

pub struct MutationQueue {
    config: Arc<WorkerConfig>,
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetch>,
}

impl MutationQueue {
    pub fn new(
        config: Arc<WorkerConfig>,
        store: Arc<dyn PartitionStore>,
        fetcher: Arc<dyn Fetch>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }

    /// Name of the offline-data partition. Unversioned: staged records must
    /// outlive version rollovers until their replay succeeds.
    pub fn partition(&self) -> String {
        offline_data_partition(&self.config.site)
    }

    /// Stage a mutation for later replay. Performed on behalf of the calling
    /// page at submission time.
    pub async fn stage(&self, mutation: DeferredMutation) -> Result<(), StoreError> {
        let partition = self.partition();
        let key = mutation.key();
        let record = mutation.to_record()?;
        self.store.write(&partition, key.clone(), record).await?;
        tracing::info!(partition = %partition, key = %key, "staged deferred mutation");
        Ok(())
    }

    /// Read back one staged mutation, if present.
    pub async fn staged(&self, key: &RequestKey) -> Result<Option<DeferredMutation>, StoreError> {
        match self.store.read(&self.partition(), key).await? {
            Some(record) => Ok(Some(DeferredMutation::from_record(&record)?)),
            None => Ok(None),
        }
    }

    /// Snapshot all decodable records in the offline-data partition.
    pub async fn snapshot(&self) -> Result<Vec<(RequestKey, DeferredMutation)>, StoreError> {
        let partition = self.partition();
        let mut snapshot = Vec::new();
        for key in self.store.list_entries(&partition).await? {
            let Some(record) = self.store.read(&partition, &key).await? else {
                continue;
            };
            match DeferredMutation::from_record(&record) {
                Ok(mutation) => snapshot.push((key, mutation)),
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "undecodable queue record, leaving in place");
                }
            }
        }
        Ok(snapshot)
    }

    /// Drain the subset of the queue targeting `endpoint`. A record is
    /// removed if and only if its replay succeeds; each record is processed
    /// independently.
    pub async fn drain(&self, endpoint: &str) -> DrainReport {
        let partition = self.partition();
        let snapshot = match self.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(partition = %partition, error = %err, "queue snapshot failed, nothing drained");
                return DrainReport::default();
            }
        };

        let mut report = DrainReport::default();
        for attempt in plan_drain(endpoint, &snapshot) {
            let request = match attempt.mutation.to_request() {
                Ok(request) => request,
                Err(err) => {
                    tracing::warn!(key = %attempt.key, error = %err, "unreplayable record left queued");
                    report.failed += 1;
                    continue;
                }
            };
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.status.is_success() => {
                    if let Err(err) = self.store.delete_entry(&partition, &attempt.key).await {
                        tracing::warn!(key = %attempt.key, error = %err, "replayed but failed to dequeue");
                    }
                    tracing::info!(key = %attempt.key, "replayed deferred mutation");
                    report.replayed += 1;
                }
                Ok(response) => {
                    tracing::warn!(key = %attempt.key, status = %response.status, "replay rejected, record left queued");
                    report.failed += 1;
                }
                Err(err) => {
                    tracing::warn!(key = %attempt.key, error = %err, "replay failed, record left queued");
                    report.failed += 1;
                }
            }
        }
        tracing::info!(
            endpoint = %endpoint,
            replayed = report.replayed,
            failed = report.failed,
            "drain pass complete"
        );
        report
    }
}
