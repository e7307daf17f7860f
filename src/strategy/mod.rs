//! Strategy executors
//!
//! Each strategy resolves one request to one response, trading freshness
//! against availability, with cache writes as a side effect. Strategies never
//! return errors: every failure path ends in a synthetic 503, and storage
//! faults are logged and treated as cache misses. Only successful (2xx/3xx)
//! responses are written back, so a flapping origin can never overwrite a
//! good cached entry.
//!
//! There is no retry loop inside a single resolution; retries belong to the
//! deferred mutation queue.

use std::sync::Arc;

use crate::fetch::{Fetch, WorkerRequest, WorkerResponse};
use crate::router::StrategyKind;
use crate::store::{PartitionStore, RequestKey, StoredResponse};

/// Resolve a request against a partition using the given strategy.
pub async fn execute(
    kind: StrategyKind,
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetch>,
    partition: &str,
    request: &WorkerRequest,
) -> WorkerResponse {
    match kind {
        StrategyKind::CacheFirst => cache_first(store, fetcher, partition, request).await,
        StrategyKind::NetworkFirst => network_first(store, fetcher, partition, request).await,
        StrategyKind::StaleWhileRevalidate => {
            stale_while_revalidate(store, fetcher, partition, request).await
        }
        StrategyKind::NetworkOnly => network_only(fetcher, request).await,
        StrategyKind::CacheOnly => cache_only(store, partition, request).await,
    }
}

/// Cache lookup; storage errors read as a miss.
async fn lookup(
    store: &dyn PartitionStore,
    partition: &str,
    key: &RequestKey,
) -> Option<WorkerResponse> {
    match store.read(partition, key).await {
        Ok(entry) => entry.map(|stored| stored.to_response()),
        Err(err) => {
            tracing::warn!(partition = %partition, key = %key, error = %err, "cache read failed");
            None
        }
    }
}

/// Write-back for successful responses; anything else is left unwritten.
/// Storage errors are logged, never surfaced.
async fn write_back(
    store: &dyn PartitionStore,
    partition: &str,
    key: RequestKey,
    response: &WorkerResponse,
) {
    if !response.is_cacheable() {
        return;
    }
    if let Err(err) = store
        .write(partition, key.clone(), StoredResponse::from(response))
        .await
    {
        tracing::warn!(partition = %partition, key = %key, error = %err, "cache write failed");
    }
}

/// Cache-first: serve a hit without touching the network; on a miss, fetch
/// and write through. This content is normally pre-warmed, so a miss plus a
/// network failure is genuine unavailability.
async fn cache_first(
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetch>,
    partition: &str,
    request: &WorkerRequest,
) -> WorkerResponse {
    let key = request.key();
    if let Some(hit) = lookup(store.as_ref(), partition, &key).await {
        return hit;
    }
    match fetcher.fetch(request).await {
        Ok(response) => {
            write_back(store.as_ref(), partition, key, &response).await;
            response
        }
        Err(err) => {
            tracing::warn!(partition = %partition, key = %key, error = %err, "cache-first miss with failed fetch");
            WorkerResponse::service_unavailable()
        }
    }
}

/// Network-first: fetch, write through on success; on network failure fall
/// back to the cached entry, then (for navigations) to the cached root
/// document, then to the synthetic 503.
async fn network_first(
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetch>,
    partition: &str,
    request: &WorkerRequest,
) -> WorkerResponse {
    let key = request.key();
    match fetcher.fetch(request).await {
        Ok(response) => {
            write_back(store.as_ref(), partition, key, &response).await;
            response
        }
        Err(err) => {
            tracing::debug!(key = %key, error = %err, "network-first falling back to cache");
            if let Some(hit) = lookup(store.as_ref(), partition, &key).await {
                return hit;
            }
            if request.navigation {
                if let Some(root) = lookup(store.as_ref(), partition, &request.root_key()).await {
                    return root;
                }
            }
            WorkerResponse::service_unavailable()
        }
    }
}

/// Stale-while-revalidate: serve the cached entry immediately and refresh it
/// from the network in the background. Without a cached entry the caller
/// waits for the network; if that fetch also fails, the resolution is the
/// synthetic 503 (an empty cache leaves nothing stale to serve).
async fn stale_while_revalidate(
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetch>,
    partition: &str,
    request: &WorkerRequest,
) -> WorkerResponse {
    let key = request.key();
    let cached = lookup(store.as_ref(), partition, &key).await;

    let revalidate = {
        let store = store.clone();
        let fetcher = fetcher.clone();
        let request = request.clone();
        let partition = partition.to_string();
        let key = key.clone();
        async move {
            match fetcher.fetch(&request).await {
                Ok(response) => {
                    write_back(store.as_ref(), &partition, key, &response).await;
                    Some(response)
                }
                Err(err) => {
                    // Swallowed: the already-served cached value stands in.
                    tracing::debug!(key = %key, error = %err, "background revalidation failed");
                    None
                }
            }
        }
    };

    match cached {
        Some(hit) => {
            // Revalidation races later reads of the same key; most recent
            // network success wins, no locking.
            tokio::spawn(revalidate);
            hit
        }
        None => revalidate
            .await
            .unwrap_or_else(WorkerResponse::service_unavailable),
    }
}

/// Network-only: always fetch, no cache on either side.
async fn network_only(fetcher: Arc<dyn Fetch>, request: &WorkerRequest) -> WorkerResponse {
    match fetcher.fetch(request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(url = %request.url, error = %err, "network-only fetch failed");
            WorkerResponse::service_unavailable()
        }
    }
}

/// Cache-only: always read from the partition; a miss is unavailability.
async fn cache_only(
    store: Arc<dyn PartitionStore>,
    partition: &str,
    request: &WorkerRequest,
) -> WorkerResponse {
    lookup(store.as_ref(), partition, &request.key())
        .await
        .unwrap_or_else(WorkerResponse::service_unavailable)
}
