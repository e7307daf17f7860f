//! Offline proxy facade
//!
//! Ties the classifier, strategy executors, lifecycle manager and mutation
//! queue together behind one type. Per-request flow: classify → pick the
//! partition for the current version → execute the strategy. Requests the
//! classifier declines are not intercepted and proceed as normal network
//! requests.

use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::events::{Host, Notification, NotificationAction};
use crate::fetch::{Fetch, WorkerRequest, WorkerResponse};
use crate::lifecycle::LifecycleManager;
use crate::partition::{partition_name, PartitionRole};
use crate::queue::{DrainReport, MutationQueue};
use crate::router::RouteTable;
use crate::store::{PartitionStore, RequestKey, StoredResponse};
use crate::strategy;

/// Resolution of a fetch event.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchDecision {
    /// The proxy declines; the request proceeds to the network untouched.
    NotIntercepted,
    /// The proxy answers with this response.
    Respond(WorkerResponse),
}

pub struct OfflineProxy {
    config: Arc<WorkerConfig>,
    routes: RouteTable,
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetch>,
    host: Arc<dyn Host>,
    lifecycle: LifecycleManager,
    queue: MutationQueue,
}

impl OfflineProxy {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn PartitionStore>,
        fetcher: Arc<dyn Fetch>,
        host: Arc<dyn Host>,
    ) -> Self {
        let config = Arc::new(config);
        let lifecycle = LifecycleManager::new(
            config.clone(),
            store.clone(),
            fetcher.clone(),
            host.clone(),
        );
        let queue = MutationQueue::new(config.clone(), store.clone(), fetcher.clone());
        Self {
            config,
            routes: RouteTable::default_rules(),
            store,
            fetcher,
            host,
            lifecycle,
            queue,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    /// Resolve one fetch event.
    pub async fn handle_fetch(&self, request: &WorkerRequest) -> FetchDecision {
        let Some(route) = self.routes.classify(&request.method, &request.url) else {
            return FetchDecision::NotIntercepted;
        };
        let partition = partition_name(&self.config.site, route.role, &self.config.version);
        let response = strategy::execute(
            route.strategy,
            self.store.clone(),
            self.fetcher.clone(),
            &partition,
            request,
        )
        .await;
        FetchDecision::Respond(response)
    }

    /// Background-sync trigger: drain the queue subset for a known tag.
    /// Unknown tags are ignored.
    pub async fn handle_sync(&self, tag: &str) -> Option<DrainReport> {
        let endpoint = self.config.sync_endpoints.get(tag)?;
        tracing::info!(tag = %tag, endpoint = %endpoint, "background sync triggered");
        Some(self.queue.drain(endpoint).await)
    }

    /// Periodic trigger: refresh the cached content listing in the API
    /// partition. Returns false for unrecognized tags.
    pub async fn handle_periodic_sync(&self, tag: &str) -> bool {
        if tag != self.config.periodic.tag {
            return false;
        }
        self.refresh_content().await;
        true
    }

    /// Fetch the sync endpoint and, on success, overwrite the cached entry
    /// for the content listing. Failures only log; the stale entry stands.
    async fn refresh_content(&self) {
        let source = match self.config.absolute_url(&self.config.periodic.source_path) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(error = %err, "periodic refresh misconfigured");
                return;
            }
        };
        let target = match self.config.absolute_url(&self.config.periodic.target_path) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(error = %err, "periodic refresh misconfigured");
                return;
            }
        };
        let request = WorkerRequest::get(source);
        match self.fetcher.fetch(&request).await {
            Ok(response) if response.is_cacheable() => {
                let partition = partition_name(
                    &self.config.site,
                    PartitionRole::Api,
                    &self.config.version,
                );
                let key = RequestKey::get(target.to_string());
                if let Err(err) = self
                    .store
                    .write(&partition, key, StoredResponse::from(&response))
                    .await
                {
                    tracing::warn!(error = %err, "periodic refresh write failed");
                } else {
                    tracing::info!(target = %target, "refreshed cached content listing");
                }
            }
            Ok(response) => {
                tracing::warn!(status = %response.status, "periodic refresh fetch not cacheable");
            }
            Err(err) => {
                tracing::warn!(error = %err, "periodic refresh fetch failed");
            }
        }
    }

    /// Push event: display a notification with the payload text, or the
    /// configured default when the payload is empty.
    pub fn handle_push(&self, payload: Option<&str>) {
        let n = &self.config.notification;
        let notification = Notification {
            title: n.title.clone(),
            body: payload
                .filter(|text| !text.is_empty())
                .unwrap_or(&n.default_body)
                .to_string(),
            icon: n.icon.clone(),
            badge: n.badge.clone(),
            actions: vec![
                NotificationAction {
                    action: "explore".to_string(),
                    title: "View updates".to_string(),
                },
                NotificationAction {
                    action: "close".to_string(),
                    title: "Close".to_string(),
                },
            ],
        };
        self.host.show_notification(&notification);
    }

    /// Notification click: `explore` opens the site root; `close` and
    /// anything else do nothing.
    pub fn handle_notification_click(&self, action: &str) {
        if action == "explore" {
            let root = format!("{}/", self.config.origin.trim_end_matches('/'));
            self.host.open_window(&root);
        }
    }
}
