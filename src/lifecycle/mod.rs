//! Lifecycle manager
//!
//! Owns the set of partitions across version upgrades: install pre-warms the
//! static and model partitions, activation deletes everything from prior
//! versions and takes over open page clients. Lifecycle never participates in
//! per-request resolution.

use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::error::ProxyError;
use crate::events::Host;
use crate::fetch::{Fetch, WorkerRequest};
use crate::partition::{current_partition_names, partition_name, PartitionRole};
use crate::store::{PartitionStore, StoredResponse};

pub struct LifecycleManager {
    config: Arc<WorkerConfig>,
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetch>,
    host: Arc<dyn Host>,
}

impl LifecycleManager {
    pub fn new(
        config: Arc<WorkerConfig>,
        store: Arc<dyn PartitionStore>,
        fetcher: Arc<dyn Fetch>,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            host,
        }
    }

    fn partition(&self, role: PartitionRole) -> String {
        partition_name(&self.config.site, role, &self.config.version)
    }

    /// Install: pre-warm the static partition (every manifest entry is
    /// mandatory) and the models partition (each entry probed first, absent
    /// assets skipped). A successful install requests immediate activation
    /// instead of waiting for old pages to close.
    pub async fn install(&self) -> Result<(), ProxyError> {
        self.prewarm_static().await?;
        self.prewarm_models().await?;
        self.host.skip_waiting();
        tracing::info!(
            site = %self.config.site,
            version = %self.config.version,
            "install complete, requested immediate activation"
        );
        Ok(())
    }

    async fn prewarm_static(&self) -> Result<(), ProxyError> {
        let partition = self.partition(PartitionRole::Static);
        self.store.open(&partition).await?;
        for path in &self.config.static_manifest {
            let url = self.config.absolute_url(path).map_err(ProxyError::Config)?;
            let request = WorkerRequest::get(url);
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| ProxyError::Install(format!("{}: {}", path, e)))?;
            if !response.is_cacheable() {
                return Err(ProxyError::Install(format!(
                    "{} returned {}",
                    path, response.status
                )));
            }
            self.store
                .write(&partition, request.key(), StoredResponse::from(&response))
                .await?;
            tracing::debug!(partition = %partition, path = %path, "pre-warmed static asset");
        }
        Ok(())
    }

    /// Model assets are optional: a missing one must not fail the install.
    async fn prewarm_models(&self) -> Result<(), ProxyError> {
        let partition = self.partition(PartitionRole::Models);
        self.store.open(&partition).await?;
        for path in &self.config.model_manifest {
            let url = match self.config.absolute_url(path) {
                Ok(url) => url,
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "skipping unresolvable model asset");
                    continue;
                }
            };
            if !self.fetcher.probe(&url).await {
                tracing::info!(path = %path, "model asset absent, skipping");
                continue;
            }
            let request = WorkerRequest::get(url);
            match self.fetcher.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    self.store
                        .write(&partition, request.key(), StoredResponse::from(&response))
                        .await?;
                    tracing::debug!(partition = %partition, path = %path, "pre-warmed model asset");
                }
                Ok(response) => {
                    tracing::warn!(path = %path, status = %response.status, "model asset fetch not cacheable, skipping");
                }
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "model asset fetch failed, skipping");
                }
            }
        }
        Ok(())
    }

    /// Activate: delete every partition whose name is not in the current set
    /// (the offline-data partition is always in the set), each deletion
    /// independent, then claim all open page clients. Idempotent for an
    /// unchanged version.
    pub async fn activate(&self) -> Result<(), ProxyError> {
        let keep = current_partition_names(&self.config.site, &self.config.version);
        let names = self.store.list_partitions().await?;
        for name in names {
            if keep.contains(&name) {
                continue;
            }
            match self.store.delete_partition(&name).await {
                Ok(_) => {
                    tracing::info!(partition = %name, "deleted stale partition");
                }
                Err(err) => {
                    // One failed deletion must not abort cleanup of the rest.
                    tracing::warn!(partition = %name, error = %err, "failed to delete stale partition");
                }
            }
        }
        self.host.claim_clients();
        tracing::info!(version = %self.config.version, "activation complete, clients claimed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{HostCall, RecordingHost};
    use crate::fetch::FakeFetcher;
    use crate::store::{MemoryStore, RequestKey, StoreError};
    use async_trait::async_trait;

    /// Store whose `delete_partition` fails for one configured name.
    struct StuckPartitionStore {
        inner: MemoryStore,
        stuck: String,
    }

    #[async_trait]
    impl PartitionStore for StuckPartitionStore {
        async fn open(&self, partition: &str) -> Result<(), StoreError> {
            self.inner.open(partition).await
        }

        async fn read(
            &self,
            partition: &str,
            key: &RequestKey,
        ) -> Result<Option<StoredResponse>, StoreError> {
            self.inner.read(partition, key).await
        }

        async fn write(
            &self,
            partition: &str,
            key: RequestKey,
            response: StoredResponse,
        ) -> Result<(), StoreError> {
            self.inner.write(partition, key, response).await
        }

        async fn delete_entry(
            &self,
            partition: &str,
            key: &RequestKey,
        ) -> Result<bool, StoreError> {
            self.inner.delete_entry(partition, key).await
        }

        async fn list_entries(&self, partition: &str) -> Result<Vec<RequestKey>, StoreError> {
            self.inner.list_entries(partition).await
        }

        async fn delete_partition(&self, partition: &str) -> Result<bool, StoreError> {
            if partition == self.stuck {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "partition directory locked",
                )));
            }
            self.inner.delete_partition(partition).await
        }

        async fn list_partitions(&self) -> Result<Vec<String>, StoreError> {
            self.inner.list_partitions().await
        }
    }

    fn manager(
        config: WorkerConfig,
    ) -> (
        LifecycleManager,
        Arc<MemoryStore>,
        Arc<FakeFetcher>,
        Arc<RecordingHost>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(FakeFetcher::new());
        let host = Arc::new(RecordingHost::new());
        let lifecycle = LifecycleManager::new(
            Arc::new(config),
            store.clone(),
            fetcher.clone(),
            host.clone(),
        );
        (lifecycle, store, fetcher, host)
    }

    fn small_config() -> WorkerConfig {
        WorkerConfig {
            site: "site".to_string(),
            version: "v1".to_string(),
            origin: "https://site.example".to_string(),
            static_manifest: vec!["/".to_string(), "/index.html".to_string()],
            model_manifest: vec![
                "/models/fault-model.json".to_string(),
                "/models/optional.bin".to_string(),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_install_prewarms_static_manifest() {
        let (lifecycle, store, fetcher, host) = manager(small_config());
        fetcher.respond_ok("https://site.example/", "<shell>");
        fetcher.respond_ok("https://site.example/index.html", "<shell>");

        lifecycle.install().await.unwrap();

        let key = RequestKey::get("https://site.example/");
        assert!(store.read("site-static-v1", &key).await.unwrap().is_some());
        assert!(host.contains(&HostCall::SkipWaiting));
    }

    #[tokio::test]
    async fn test_install_fails_when_mandatory_asset_unavailable() {
        let (lifecycle, _store, fetcher, host) = manager(small_config());
        fetcher.respond_ok("https://site.example/", "<shell>");
        // /index.html is unscripted and fails as a network error.

        let err = lifecycle.install().await.unwrap_err();
        assert!(matches!(err, ProxyError::Install(_)));
        assert!(!host.contains(&HostCall::SkipWaiting));
    }

    #[tokio::test]
    async fn test_install_skips_model_assets_that_fail_the_probe() {
        let (lifecycle, store, fetcher, _host) = manager(small_config());
        fetcher.respond_ok("https://site.example/", "<shell>");
        fetcher.respond_ok("https://site.example/index.html", "<shell>");
        fetcher.allow_probe("https://site.example/models/fault-model.json");
        fetcher.respond_ok("https://site.example/models/fault-model.json", "weights");
        // /models/optional.bin has no probe and must be skipped silently.

        lifecycle.install().await.unwrap();

        assert!(store
            .read(
                "site-models-v1",
                &RequestKey::get("https://site.example/models/fault-model.json")
            )
            .await
            .unwrap()
            .is_some());
        assert!(store
            .read(
                "site-models-v1",
                &RequestKey::get("https://site.example/models/optional.bin")
            )
            .await
            .unwrap()
            .is_none());
        assert_eq!(fetcher.fetch_count("https://site.example/models/optional.bin"), 0);
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_versions_only() {
        let config = WorkerConfig {
            version: "v2.0.0".to_string(),
            ..small_config()
        };
        let (lifecycle, store, _fetcher, host) = manager(config);
        for name in [
            "site-static-v1.0.0",
            "site-api-v1.0.0",
            "site-static-v2.0.0",
            "site-api-v2.0.0",
        ] {
            store.open(name).await.unwrap();
        }

        lifecycle.activate().await.unwrap();

        let mut remaining = store.list_partitions().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["site-api-v2.0.0", "site-static-v2.0.0"]);
        assert!(host.contains(&HostCall::ClaimClients));
    }

    #[tokio::test]
    async fn test_one_failed_deletion_does_not_abort_cleanup() {
        let store = Arc::new(StuckPartitionStore {
            inner: MemoryStore::new(),
            stuck: "site-static-v0".to_string(),
        });
        for name in ["site-static-v0", "site-api-v0", "site-static-v1"] {
            store.open(name).await.unwrap();
        }
        let host = Arc::new(RecordingHost::new());
        let lifecycle = LifecycleManager::new(
            Arc::new(small_config()),
            store.clone(),
            Arc::new(FakeFetcher::new()),
            host.clone(),
        );

        lifecycle.activate().await.unwrap();

        // The other stale partition is still cleaned up and clients claimed.
        let mut remaining = store.list_partitions().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["site-static-v0", "site-static-v1"]);
        assert!(host.contains(&HostCall::ClaimClients));
    }

    #[tokio::test]
    async fn test_activate_twice_is_idempotent() {
        let (lifecycle, store, _fetcher, _host) = manager(small_config());
        store.open("site-static-v1").await.unwrap();
        store.open("site-static-v0").await.unwrap();

        lifecycle.activate().await.unwrap();
        let after_first = {
            let mut names = store.list_partitions().await.unwrap();
            names.sort();
            names
        };
        lifecycle.activate().await.unwrap();
        let after_second = {
            let mut names = store.list_partitions().await.unwrap();
            names.sort();
            names
        };
        assert_eq!(after_first, after_second);
        assert_eq!(after_first, vec!["site-static-v1"]);
    }
}
