//! Per-channel polling scheduler. One cancellable task per monitored
//! channel; configuration is re-read every cycle, per-timeframe failures
//! become channel notices, and loop-level failures back off and retry; a
//! channel task never dies silently.

use crate::alert::{AlertSink, ChannelEvent, CorrectionAlert, RallyAlert};
use crate::config::MonitorConfig;
use crate::dedup::{dedup_key, AlertDedupStore, AlertKind, CooloffGate};
use crate::error::MonitorError;
use crate::provider::ProviderChain;
use crate::store::{ChannelConfig, ChannelKey, ConfigStore};
use rally_core::{IndicatorFrame, Timeframe};
use rally_signals::{confluence_zones, exit_triggers, rally_score, Zone};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// What one pass over a channel did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Channel is disabled; poll again shortly for re-enable.
    Disabled,
    /// All configured timeframes were scanned (individual failures were
    /// reported as notices).
    Scanned,
}

pub struct Monitor {
    config: MonitorConfig,
    store: Arc<ConfigStore>,
    dedup: Arc<AlertDedupStore>,
    cooloff: CooloffGate,
    chain: Arc<ProviderChain>,
    sink: Arc<dyn AlertSink>,
    tasks: Mutex<FxHashMap<ChannelKey, JoinHandle<()>>>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        store: Arc<ConfigStore>,
        dedup: Arc<AlertDedupStore>,
        chain: Arc<ProviderChain>,
        sink: Arc<dyn AlertSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            dedup,
            cooloff: CooloffGate::new(),
            chain,
            sink,
            tasks: Mutex::new(FxHashMap::default()),
        })
    }

    /// Spawn the scan loop for a channel. Returns false (and spawns nothing)
    /// when a live task already exists.
    pub async fn start_channel(self: &Arc<Self>, key: ChannelKey) -> bool {
        let mut tasks = self.tasks.lock().await;
        if let Some(handle) = tasks.get(&key) {
            if !handle.is_finished() {
                return false;
            }
        }
        let monitor = Arc::clone(self);
        tasks.insert(key, tokio::spawn(async move { monitor.scan_loop(key).await }));
        tracing::info!(%key, "channel monitoring started");
        true
    }

    /// Cancel a channel's task. Returns false when nothing was running.
    pub async fn stop_channel(&self, key: ChannelKey) -> bool {
        match self.tasks.lock().await.remove(&key) {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                tracing::info!(%key, "channel monitoring stopped");
                true
            }
            _ => false,
        }
    }

    pub async fn is_running(&self, key: ChannelKey) -> bool {
        self.tasks
            .lock()
            .await
            .get(&key)
            .is_some_and(|h| !h.is_finished())
    }

    pub async fn stop_all(&self) {
        let mut tasks = self.tasks.lock().await;
        for (key, handle) in tasks.drain() {
            handle.abort();
            tracing::info!(%key, "channel monitoring stopped");
        }
    }

    async fn scan_loop(self: Arc<Self>, key: ChannelKey) {
        loop {
            match self.scan_channel_once(key).await {
                Ok(CycleOutcome::Disabled) => {
                    sleep(Duration::from_secs(self.config.disabled_poll_secs)).await;
                }
                Ok(CycleOutcome::Scanned) => {
                    sleep(Duration::from_secs(self.config.cycle_secs)).await;
                }
                Err(e) => {
                    tracing::warn!(%key, %e, "scan cycle failed, backing off");
                    self.sink
                        .deliver(key, ChannelEvent::Notice(format!("scan loop error: {e}")))
                        .await;
                    sleep(Duration::from_secs(self.config.backoff_secs)).await;
                }
            }
        }
    }

    /// One full pass over a channel: reload config, scan every configured
    /// timeframe independently. Also the entry point for a manual
    /// "scan now".
    pub async fn scan_channel_once(&self, key: ChannelKey) -> Result<CycleOutcome, MonitorError> {
        let cfg = self.store.get(key).await;
        if !cfg.enabled {
            return Ok(CycleOutcome::Disabled);
        }
        if cfg.symbol.trim().is_empty() || cfg.exchange.trim().is_empty() {
            return Err(MonitorError::ConfigMissing(key.to_string()));
        }

        for tf in &cfg.timeframes {
            if let Err(e) = self.scan_timeframe(key, &cfg, *tf).await {
                tracing::warn!(%key, symbol = %cfg.symbol, timeframe = %tf, %e, "timeframe scan failed");
                self.sink
                    .deliver(key, ChannelEvent::Notice(format!("{} {}: {e}", cfg.symbol, tf)))
                    .await;
            }
        }
        Ok(CycleOutcome::Scanned)
    }

    /// On-demand confluence zones for a channel, per configured timeframe
    /// (first 4), strongest zones first and truncated to the configured
    /// top-N. Daily candles provide the floor pivots; per-channel
    /// zigzag/tolerance overrides apply.
    pub async fn channel_zones(
        &self,
        key: ChannelKey,
    ) -> Result<Vec<(Timeframe, Result<Vec<Zone>, MonitorError>)>, MonitorError> {
        const MAX_ZONE_TIMEFRAMES: usize = 4;

        let cfg = self.store.get(key).await;
        if cfg.symbol.trim().is_empty() || cfg.exchange.trim().is_empty() {
            return Err(MonitorError::ConfigMissing(key.to_string()));
        }
        let params = cfg.zone_params();
        let daily = self
            .chain
            .fetch(&cfg.symbol, Timeframe::D1, 30)
            .await
            .ok();

        let mut out = Vec::new();
        for tf in cfg.timeframes.iter().take(MAX_ZONE_TIMEFRAMES) {
            let result = match self
                .chain
                .fetch(&cfg.symbol, *tf, self.config.fetch_limit)
                .await
            {
                Ok(series) => {
                    let frame = IndicatorFrame::standard(series);
                    let mut zones = confluence_zones(&frame, daily.as_ref(), &params);
                    zones.truncate(self.config.top_zones);
                    Ok(zones)
                }
                Err(e) => Err(MonitorError::Provider(e)),
            };
            out.push((*tf, result));
        }
        Ok(out)
    }

    async fn scan_timeframe(
        &self,
        key: ChannelKey,
        cfg: &ChannelConfig,
        timeframe: Timeframe,
    ) -> Result<(), MonitorError> {
        let series = self
            .chain
            .fetch(&cfg.symbol, timeframe, self.config.fetch_limit)
            .await?;
        let frame = IndicatorFrame::standard(series);
        let Some(last) = frame.last() else {
            return Err(MonitorError::NoData { symbol: cfg.symbol.clone(), timeframe });
        };

        let rally = rally_score(&frame, cfg.rsi_rally_min, cfg.vol_spike_mult);
        let exits = exit_triggers(&frame, cfg.rsi_exit_overbought);

        // Both gates apply independently: wall-clock cooloff per
        // (channel, timeframe), and bar-identity dedup per alert kind.
        let cool_key = format!("{key}:{timeframe}");
        let cooloff = Duration::from_secs(cfg.cooloff_minutes * 60);
        let cool_ok = self.cooloff.ready(&cool_key, cooloff).await;

        if rally.score as u32 >= cfg.rally_score_needed && cool_ok {
            let bar_key = dedup_key(key, &cfg.symbol, timeframe, AlertKind::Rally);
            if !self.dedup.seen(&bar_key, last.candle.ts).await {
                self.cooloff.mark(&cool_key).await;
                self.sink
                    .deliver(
                        key,
                        ChannelEvent::Rally(RallyAlert {
                            symbol: cfg.symbol.clone(),
                            exchange: cfg.exchange.clone(),
                            timeframe,
                            price: last.candle.close,
                            rsi: last.rsi,
                            score: rally.score as u32,
                            reasons: rally.reasons.clone(),
                            bar_ts: last.candle.ts,
                        }),
                    )
                    .await;
            }
        }

        if exits.len() >= 2 && cool_ok {
            let bar_key = dedup_key(key, &cfg.symbol, timeframe, AlertKind::Exit);
            if !self.dedup.seen(&bar_key, last.candle.ts).await {
                self.cooloff.mark(&cool_key).await;
                self.sink
                    .deliver(
                        key,
                        ChannelEvent::Correction(CorrectionAlert {
                            symbol: cfg.symbol.clone(),
                            exchange: cfg.exchange.clone(),
                            timeframe,
                            price: last.candle.close,
                            rsi: last.rsi,
                            reasons: exits,
                            bar_ts: last.candle.ts,
                        }),
                    )
                    .await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::testutil::RecordingSink;
    use crate::provider::{OhlcvProvider, ProviderError};
    use crate::store::ChannelConfigUpdate;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rally_core::{Candle, CandleSeries};

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

    struct Broken;

    #[async_trait]
    impl OhlcvProvider for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn fetch(
            &self,
            _: &str,
            _: Timeframe,
            _: usize,
        ) -> Result<CandleSeries, ProviderError> {
            Err(ProviderError::Transport("connection refused".to_string()))
        }
    }

    fn candle(i: usize, close: f64, volume: f64) -> Candle {
        Candle {
            ts: Utc.timestamp_opt(i as i64 * 14400, 0).unwrap(),
            open: close * 0.996,
            high: close * 1.003,
            low: close * 0.994,
            close,
            volume,
        }
    }

    fn rally_series() -> CandleSeries {
        (0..60)
            .map(|i| {
                let close = 100.0 * 1.01f64.powi(i as i32);
                let volume = if i == 59 { 30.0 } else { 10.0 };
                candle(i, close, volume)
            })
            .collect()
    }

    /// A long rise rolling over: RSI slips out of overbought and the MACD
    /// histogram falls for several bars.
    fn correction_series() -> CandleSeries {
        let mut out: CandleSeries = (0..50)
            .map(|i| candle(i, 100.0 * 1.01f64.powi(i as i32), 10.0))
            .collect();
        let mut close = out.last().unwrap().close;
        for i in 50..54 {
            close *= 0.99;
            out.push(candle(i, close, 10.0));
        }
        out
    }

    fn service(
        provider: Arc<dyn OhlcvProvider>,
        dir: &tempfile::TempDir,
    ) -> (Arc<Monitor>, Arc<ConfigStore>, Arc<RecordingSink>) {
        let store = Arc::new(ConfigStore::load(dir.path().join("state.json")));
        let dedup = Arc::new(AlertDedupStore::in_memory());
        let chain = Arc::new(ProviderChain::new(vec![provider], Duration::from_secs(5)));
        let sink = Arc::new(RecordingSink::new());
        let config = MonitorConfig::from_env();
        let monitor = Monitor::new(config, store.clone(), dedup, chain, sink.clone());
        (monitor, store, sink)
    }

    async fn enable(store: &ConfigStore, key: ChannelKey) {
        store
            .update(
                key,
                ChannelConfigUpdate {
                    enabled: Some(true),
                    timeframes: Some(vec![Timeframe::H4]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, _store, _sink) = service(Arc::new(Scripted(rally_series())), &dir);
        let key = ChannelKey::new(1, 2);

        assert!(monitor.start_channel(key).await);
        assert!(!monitor.start_channel(key).await, "double start must not spawn");
        assert!(monitor.is_running(key).await);

        assert!(monitor.stop_channel(key).await);
        assert!(!monitor.stop_channel(key).await, "double stop is a no-op");
        assert!(!monitor.is_running(key).await);

        assert!(!monitor.stop_channel(ChannelKey::new(9, 9)).await);
    }

    #[tokio::test]
    async fn disabled_channel_scans_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, _store, sink) = service(Arc::new(Scripted(rally_series())), &dir);
        let key = ChannelKey::new(1, 2);

        let outcome = monitor.scan_channel_once(key).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Disabled);
        assert!(sink.take().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rally_alert_fires_once_per_bar() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store, sink) = service(Arc::new(Scripted(rally_series())), &dir);
        let key = ChannelKey::new(1, 2);
        enable(&store, key).await;

        assert_eq!(
            monitor.scan_channel_once(key).await.unwrap(),
            CycleOutcome::Scanned
        );
        let events = sink.take().await;
        assert_eq!(events.len(), 1, "events: {events:?}");
        match &events[0].1 {
            ChannelEvent::Rally(a) => {
                assert!(a.score >= 3);
                assert_eq!(a.reasons.len() as u32, a.score);
                assert_eq!(a.timeframe, Timeframe::H4);
            }
            other => panic!("expected rally alert, got {other:?}"),
        }

        // well past the cooloff, same still-open bar: dedup must suppress
        tokio::time::advance(Duration::from_secs(2 * 3600)).await;
        monitor.scan_channel_once(key).await.unwrap();
        assert!(sink.take().await.is_empty(), "same bar must not re-alert");
    }

    #[tokio::test]
    async fn cooloff_blocks_inside_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store, sink) = service(Arc::new(Scripted(rally_series())), &dir);
        let key = ChannelKey::new(1, 2);
        enable(&store, key).await;

        monitor.scan_channel_once(key).await.unwrap();
        assert_eq!(sink.take().await.len(), 1);

        // immediately re-scan: the cooloff window is still closed
        monitor.scan_channel_once(key).await.unwrap();
        assert!(sink.take().await.is_empty());
    }

    #[tokio::test]
    async fn two_exit_triggers_raise_a_correction() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store, sink) = service(Arc::new(Scripted(correction_series())), &dir);
        let key = ChannelKey::new(1, 2);
        enable(&store, key).await;

        monitor.scan_channel_once(key).await.unwrap();
        let events = sink.take().await;
        assert_eq!(events.len(), 1);
        match &events[0].1 {
            ChannelEvent::Correction(a) => assert!(a.reasons.len() >= 2),
            other => panic!("expected correction alert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provider_failure_becomes_a_notice_and_the_cycle_survives() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store, sink) = service(Arc::new(Broken), &dir);
        let key = ChannelKey::new(1, 2);
        enable(&store, key).await;

        let outcome = monitor.scan_channel_once(key).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Scanned);
        let events = sink.take().await;
        assert_eq!(events.len(), 1);
        match &events[0].1 {
            ChannelEvent::Notice(text) => assert!(text.contains("connection refused")),
            other => panic!("expected notice, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn channel_zones_report_per_timeframe_and_truncate_to_top_n() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store, _sink) = service(Arc::new(Scripted(rally_series())), &dir);
        let key = ChannelKey::new(1, 2);
        enable(&store, key).await;

        let results = monitor.channel_zones(key).await.unwrap();
        assert_eq!(results.len(), 1);
        let (tf, zones) = &results[0];
        assert_eq!(*tf, Timeframe::H4);
        let zones = zones.as_ref().unwrap();
        assert!(!zones.is_empty());
        assert!(zones.len() <= 6);
        for pair in zones.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn blanked_symbol_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let (monitor, store, _sink) = service(Arc::new(Scripted(rally_series())), &dir);
        let key = ChannelKey::new(1, 2);
        store
            .update(
                key,
                ChannelConfigUpdate {
                    enabled: Some(true),
                    symbol: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = monitor.scan_channel_once(key).await.unwrap_err();
        assert!(matches!(err, MonitorError::ConfigMissing(_)));
    }
}
