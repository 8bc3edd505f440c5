use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use rally_monitor::alert::{AlertSink, LogSink};
use rally_monitor::dedup::AlertDedupStore;
use rally_monitor::provider::ProviderChain;
use rally_monitor::providers::KrakenProvider;
use rally_monitor::registry::default_registry;
use rally_monitor::scheduler::Monitor;
use rally_monitor::store::ConfigStore;
use rally_monitor::watch::{WatchService, WatchStore};
use rally_monitor::MonitorConfig;

#[tokio::main]
async fn main() {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = MonitorConfig::from_env();

    let store = Arc::new(ConfigStore::load(&cfg.state_path));
    let dedup = Arc::new(AlertDedupStore::load(&cfg.alerts_path));
    let watch_store = Arc::new(WatchStore::load(&cfg.watch_state_path));
    let chain = Arc::new(ProviderChain::new(
        vec![Arc::new(KrakenProvider::new())],
        Duration::from_secs(cfg.fetch_timeout_secs),
    ));
    let sink: Arc<dyn AlertSink> = Arc::new(LogSink);

    let registry = default_registry();
    tracing::info!(commands = registry.len(), "command surface registered");

    let monitor = Monitor::new(
        cfg.clone(),
        Arc::clone(&store),
        Arc::clone(&dedup),
        Arc::clone(&chain),
        Arc::clone(&sink),
    );

    // Restore-on-boot: channels whose stored config is enabled resume
    // monitoring without an external start command.
    for key in store.enabled_channels().await {
        if monitor.start_channel(key).await {
            tracing::info!(%key, "restored channel monitoring");
        }
    }

    let watch = WatchService::new(cfg, store, watch_store, dedup, chain, sink);
    let watch_task = watch.spawn();

    tracing::info!("rally monitor running");
    shutdown_signal().await;

    watch_task.abort();
    monitor.stop_all().await;
    tracing::info!("all channel tasks stopped");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received, gracefully stopping…");
}
