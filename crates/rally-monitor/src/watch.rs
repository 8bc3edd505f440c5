//! Ignition watch: a separate per-channel enablement store and one
//! background worker sweeping every watch-enabled channel for
//! ignition/killswitch signals, gated by bar-identity dedup only.

use crate::alert::{AlertSink, ChannelEvent};
use crate::config::MonitorConfig;
use crate::dedup::{dedup_key, AlertDedupStore, AlertKind};
use crate::error::MonitorError;
use crate::provider::ProviderChain;
use crate::store::{ChannelKey, ConfigStore};
use rally_core::Timeframe;
use rally_signals::{detect_ignition, IgnitionSignal};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::sleep;

fn default_watch_timeframes() -> Vec<Timeframe> {
    vec![
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ]
}

fn default_keltner_mult() -> f64 {
    1.5
}

/// Per-channel ignition-watch state. The monitored symbol comes from the
/// channel's main config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_watch_timeframes")]
    pub timeframes: Vec<Timeframe>,
    #[serde(default = "default_keltner_mult")]
    pub keltner_mult: f64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeframes: default_watch_timeframes(),
            keltner_mult: default_keltner_mult(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WatchUpdate {
    pub enabled: Option<bool>,
    pub timeframes: Option<Vec<Timeframe>>,
    pub keltner_mult: Option<f64>,
}

/// JSON-file backed watch state, keyed like the main config store.
pub struct WatchStore {
    path: PathBuf,
    map: RwLock<FxHashMap<String, WatchConfig>>,
}

impl WatchStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path, map: RwLock::new(map) }
    }

    pub async fn get(&self, key: ChannelKey) -> WatchConfig {
        self.map
            .read()
            .await
            .get(&key.to_string())
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set(&self, key: ChannelKey, update: WatchUpdate) -> Result<WatchConfig, MonitorError> {
        let mut map = self.map.write().await;
        let cfg = map.entry(key.to_string()).or_default();
        if let Some(v) = update.enabled {
            cfg.enabled = v;
        }
        if let Some(v) = update.timeframes {
            cfg.timeframes = v;
        }
        if let Some(v) = update.keltner_mult {
            cfg.keltner_mult = v;
        }
        let merged = cfg.clone();
        let raw = serde_json::to_string_pretty(&*map)?;
        std::fs::write(&self.path, raw)?;
        Ok(merged)
    }

    pub async fn iter_enabled(&self) -> Vec<(ChannelKey, WatchConfig)> {
        self.map
            .read()
            .await
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .filter_map(|(k, cfg)| Some((k.parse().ok()?, cfg.clone())))
            .collect()
    }
}

/// The sweep worker plus the manual scan entry point.
pub struct WatchService {
    config: MonitorConfig,
    store: Arc<ConfigStore>,
    watch: Arc<WatchStore>,
    dedup: Arc<AlertDedupStore>,
    chain: Arc<ProviderChain>,
    sink: Arc<dyn AlertSink>,
}

impl WatchService {
    pub fn new(
        config: MonitorConfig,
        store: Arc<ConfigStore>,
        watch: Arc<WatchStore>,
        dedup: Arc<AlertDedupStore>,
        chain: Arc<ProviderChain>,
        sink: Arc<dyn AlertSink>,
    ) -> Arc<Self> {
        Arc::new(Self { config, store, watch, dedup, chain, sink })
    }

    /// Spawn the background worker. It never exits on its own; abort the
    /// handle to stop it.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                service.sweep().await;
                sleep(Duration::from_secs(service.config.watch_poll_secs)).await;
            }
        })
    }

    /// One pass over every watch-enabled channel. Per-timeframe failures
    /// become channel notices and never break the sweep.
    pub async fn sweep(&self) {
        for (key, wcfg) in self.watch.iter_enabled().await {
            let symbol = self.store.get(key).await.symbol;
            for tf in &wcfg.timeframes {
                if let Err(e) = self.scan_one(key, &symbol, *tf, wcfg.keltner_mult).await {
                    tracing::warn!(%key, %symbol, timeframe = %tf, %e, "watch scan failed");
                    self.sink
                        .deliver(key, ChannelEvent::Notice(format!("{symbol} {tf}: {e}")))
                        .await;
                }
            }
        }
    }

    async fn scan_one(
        &self,
        key: ChannelKey,
        symbol: &str,
        timeframe: Timeframe,
        keltner_mult: f64,
    ) -> Result<(), MonitorError> {
        let series = self
            .chain
            .fetch(symbol, timeframe, self.config.watch_fetch_limit)
            .await?;
        // too little history is "no signal", not a failure
        let Some(sig) = detect_ignition(&series, keltner_mult) else {
            return Ok(());
        };

        if sig.ignition {
            let bar_key = dedup_key(key, symbol, timeframe, AlertKind::Ignition);
            if !self.dedup.seen(&bar_key, sig.bar_ts).await {
                self.sink
                    .deliver(
                        key,
                        ChannelEvent::Ignition {
                            symbol: symbol.to_string(),
                            timeframe,
                            signal: sig,
                        },
                    )
                    .await;
            }
        } else if sig.killswitch {
            let bar_key = dedup_key(key, symbol, timeframe, AlertKind::Killswitch);
            if !self.dedup.seen(&bar_key, sig.bar_ts).await {
                self.sink
                    .deliver(
                        key,
                        ChannelEvent::Killswitch {
                            symbol: symbol.to_string(),
                            timeframe,
                            bar_ts: sig.bar_ts,
                        },
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Manual scan of one channel across its watch timeframes, bypassing
    /// both gates. Each entry is the detector outcome for that timeframe.
    pub async fn scan_now(
        &self,
        key: ChannelKey,
    ) -> Vec<(Timeframe, Result<Option<IgnitionSignal>, MonitorError>)> {
        let wcfg = self.watch.get(key).await;
        let symbol = self.store.get(key).await.symbol;
        let mut out = Vec::with_capacity(wcfg.timeframes.len());
        for tf in wcfg.timeframes {
            let result = match self
                .chain
                .fetch(&symbol, tf, self.config.watch_fetch_limit)
                .await
            {
                Ok(series) => Ok(detect_ignition(&series, wcfg.keltner_mult)),
                Err(e) => Err(MonitorError::Provider(e)),
            };
            out.push((tf, result));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::testutil::RecordingSink;
    use crate::provider::{OhlcvProvider, ProviderError};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rally_core::{Candle, CandleSeries};

    fn bar(i: usize, close: f64, volume: f64) -> Candle {
        Candle {
            ts: Utc.timestamp_opt(i as i64 * 900, 0).unwrap(),
            open: close * 0.998,
            high: close * 1.002,
            low: close * 0.996,
            close,
            volume,
        }
    }

    /// Flat chop then a vertical breakout leg; fires ignition.
    fn breakout_series() -> CandleSeries {
        let mut out = Vec::new();
        for i in 0..30 {
            let wiggle = if i % 2 == 0 { 0.2 } else { -0.2 };
            out.push(bar(i, 100.0 + wiggle, 10.0));
        }
        let mut close = 100.0;
        for i in 30..40 {
            close *= 1.02;
            let volume = if i == 39 { 30.0 } else { 12.0 };
            out.push(bar(i, close, volume));
        }
        out
    }

    struct Scripted(CandleSeries);

    #[async_trait]
    impl OhlcvProvider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
        async fn fetch(
            &self,
            _: &str,
            _: Timeframe,
            _: usize,
        ) -> Result<CandleSeries, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn service(
        series: CandleSeries,
        dir: &tempfile::TempDir,
    ) -> (Arc<WatchService>, Arc<WatchStore>, Arc<RecordingSink>) {
        let store = Arc::new(ConfigStore::load(dir.path().join("state.json")));
        let watch = Arc::new(WatchStore::load(dir.path().join("watch_state.json")));
        let dedup = Arc::new(AlertDedupStore::in_memory());
        let chain = Arc::new(ProviderChain::new(
            vec![Arc::new(Scripted(series))],
            Duration::from_secs(5),
        ));
        let sink = Arc::new(RecordingSink::new());
        let service = WatchService::new(
            MonitorConfig::from_env(),
            store,
            watch.clone(),
            dedup,
            chain,
            sink.clone(),
        );
        (service, watch, sink)
    }

    async fn enable(watch: &WatchStore, key: ChannelKey) {
        watch
            .set(
                key,
                WatchUpdate {
                    enabled: Some(true),
                    timeframes: Some(vec![Timeframe::M15]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn store_defaults_and_updates_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch_state.json");
        let key = ChannelKey::new(1, 2);

        let store = WatchStore::load(&path);
        let cfg = store.get(key).await;
        assert!(!cfg.enabled);
        assert_eq!(cfg.timeframes.len(), 5);
        assert_eq!(cfg.keltner_mult, 1.5);

        store
            .set(key, WatchUpdate { enabled: Some(true), keltner_mult: Some(2.0), ..Default::default() })
            .await
            .unwrap();

        let reopened = WatchStore::load(&path);
        let cfg = reopened.get(key).await;
        assert!(cfg.enabled);
        assert_eq!(cfg.keltner_mult, 2.0);
        assert_eq!(reopened.iter_enabled().await.len(), 1);
    }

    #[tokio::test]
    async fn sweep_emits_ignition_once_per_bar() {
        let dir = tempfile::tempdir().unwrap();
        let (service, watch, sink) = service(breakout_series(), &dir);
        let key = ChannelKey::new(1, 2);
        enable(&watch, key).await;

        service.sweep().await;
        let events = sink.take().await;
        assert_eq!(events.len(), 1, "events: {events:?}");
        assert!(matches!(events[0].1, ChannelEvent::Ignition { .. }));

        // same still-open bar on the next sweep: dedup suppresses
        service.sweep().await;
        assert!(sink.take().await.is_empty());
    }

    #[tokio::test]
    async fn disabled_channels_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _watch, sink) = service(breakout_series(), &dir);
        service.sweep().await;
        assert!(sink.take().await.is_empty());
    }

    #[tokio::test]
    async fn short_series_is_silent_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let short: CandleSeries = (0..10).map(|i| bar(i, 100.0, 10.0)).collect();
        let (service, watch, sink) = service(short, &dir);
        let key = ChannelKey::new(1, 2);
        enable(&watch, key).await;

        service.sweep().await;
        assert!(sink.take().await.is_empty());
    }

    #[tokio::test]
    async fn scan_now_reports_per_timeframe_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let (service, watch, _sink) = service(breakout_series(), &dir);
        let key = ChannelKey::new(1, 2);
        enable(&watch, key).await;

        let results = service.scan_now(key).await;
        assert_eq!(results.len(), 1);
        let (tf, outcome) = &results[0];
        assert_eq!(*tf, Timeframe::M15);
        let sig = outcome.as_ref().unwrap().as_ref().unwrap();
        assert!(sig.ignition);
    }
}
