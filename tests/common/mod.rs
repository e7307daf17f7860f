// Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use kurogane::config::WorkerConfig;
use kurogane::events::{Dispatcher, RecordingHost};
use kurogane::fetch::FakeFetcher;
use kurogane::proxy::OfflineProxy;
use kurogane::store::MemoryStore;

pub const ORIGIN: &str = "https://site.example";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub fetcher: Arc<FakeFetcher>,
    pub host: Arc<RecordingHost>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn proxy(&self) -> &Arc<OfflineProxy> {
        self.dispatcher.proxy()
    }
}

pub fn test_config() -> WorkerConfig {
    WorkerConfig {
        site: "site".to_string(),
        version: "v1".to_string(),
        origin: ORIGIN.to_string(),
        static_manifest: vec!["/".to_string(), "/index.html".to_string()],
        model_manifest: vec!["/models/fault-model.json".to_string()],
        ..Default::default()
    }
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: WorkerConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(FakeFetcher::new());
    let host = Arc::new(RecordingHost::new());
    let proxy = Arc::new(OfflineProxy::new(
        config,
        store.clone(),
        fetcher.clone(),
        host.clone(),
    ));
    Harness {
        store,
        fetcher,
        host,
        dispatcher: Dispatcher::new(proxy),
    }
}

/// Pre-warm the harness via a real install pass: scripts the static and
/// model manifests, then dispatches Install.
pub async fn install_ok(harness: &Harness) {
    harness.fetcher.respond_ok(&format!("{}/", ORIGIN), "<shell>");
    harness
        .fetcher
        .respond_ok(&format!("{}/index.html", ORIGIN), "<shell>");
    harness
        .fetcher
        .allow_probe(&format!("{}/models/fault-model.json", ORIGIN));
    harness
        .fetcher
        .respond_ok(&format!("{}/models/fault-model.json", ORIGIN), "weights");
    let outcome = harness
        .dispatcher
        .dispatch(kurogane::events::EventKind::Install)
        .await;
    assert!(
        matches!(outcome, kurogane::events::EventOutcome::Completed),
        "install fixture failed: {:?}",
        outcome
    );
}
