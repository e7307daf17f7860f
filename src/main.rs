use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use kurogane::config::WorkerConfig;
use kurogane::events::{Dispatcher, EventKind, NullHost};
use kurogane::fetch::HttpFetcher;
use kurogane::proxy::OfflineProxy;
use kurogane::store::DiskStore;

/// Kurogane offline caching proxy - pre-warms and garbage-collects a
/// disk-backed cache directory from the configured origin
#[derive(Parser, Debug)]
#[command(name = "kurogane")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "worker.yaml")]
    config: PathBuf,

    /// Root directory for the disk-backed partition store
    #[arg(long, default_value = ".kurogane-cache")]
    cache_dir: PathBuf,

    /// Validate configuration and exit
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kurogane::logging::init_subscriber()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let args = Args::parse();

    let config = if args.config.exists() {
        WorkerConfig::from_file(&args.config).map_err(|e| anyhow::anyhow!(e))?
    } else {
        tracing::warn!(
            config_file = %args.config.display(),
            "config file not found, using built-in defaults"
        );
        WorkerConfig::default()
    };

    if args.test {
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        println!("configuration ok");
        return Ok(());
    }

    tracing::info!(
        site = %config.site,
        version = %config.version,
        origin = %config.origin,
        static_assets = config.static_manifest.len(),
        model_assets = config.model_manifest.len(),
        "starting cache warm-up"
    );

    let store = Arc::new(DiskStore::new(&args.cache_dir));
    let fetcher = Arc::new(HttpFetcher::new());
    let host = Arc::new(NullHost);
    let proxy = Arc::new(OfflineProxy::new(config, store, fetcher, host));
    let dispatcher = Dispatcher::new(proxy);

    let install = dispatcher.dispatch(EventKind::Install).await;
    if matches!(install, kurogane::events::EventOutcome::Failed) {
        anyhow::bail!("install failed, see logs");
    }
    dispatcher.dispatch(EventKind::Activate).await;

    tracing::info!(cache_dir = %args.cache_dir.display(), "warm-up complete");
    Ok(())
}
