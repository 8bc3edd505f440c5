//! Per-channel configuration store: a JSON file keyed by `"guild:channel"`,
//! created lazily with defaults and re-read by the scheduler every cycle so
//! external edits take effect without a restart. Last write wins.

use crate::error::MonitorError;
use rally_core::Timeframe;
use rally_signals::ZoneParams;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::RwLock;

/// Identity of one monitored channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub guild: u64,
    pub channel: u64,
}

impl ChannelKey {
    pub fn new(guild: u64, channel: u64) -> Self {
        Self { guild, channel }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guild, self.channel)
    }
}

impl FromStr for ChannelKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (g, c) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid channel key {s:?}; expected guild:channel"))?;
        let guild = g.parse().map_err(|_| format!("invalid guild id {g:?}"))?;
        let channel = c.parse().map_err(|_| format!("invalid channel id {c:?}"))?;
        Ok(Self { guild, channel })
    }
}

fn default_symbol() -> String {
    "WIF/USDT".to_string()
}

fn default_exchange() -> String {
    "kraken".to_string()
}

fn default_timeframes() -> Vec<Timeframe> {
    vec![Timeframe::H4, Timeframe::D1, Timeframe::W1]
}

fn default_score_needed() -> u32 {
    3
}

fn default_cooloff_minutes() -> u64 {
    60
}

fn default_rsi_rally_min() -> f64 {
    55.0
}

fn default_rsi_exit_overbought() -> f64 {
    70.0
}

fn default_vol_spike_mult() -> f64 {
    1.5
}

/// Per-channel monitoring configuration. Owned by this store; the scheduler
/// only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<Timeframe>,
    #[serde(default = "default_score_needed")]
    pub rally_score_needed: u32,
    #[serde(default = "default_cooloff_minutes")]
    pub cooloff_minutes: u64,
    #[serde(default = "default_rsi_rally_min")]
    pub rsi_rally_min: f64,
    #[serde(default = "default_rsi_exit_overbought")]
    pub rsi_exit_overbought: f64,
    #[serde(default = "default_vol_spike_mult")]
    pub vol_spike_mult: f64,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zigzag_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_tolerance: Option<f64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            exchange: default_exchange(),
            timeframes: default_timeframes(),
            rally_score_needed: default_score_needed(),
            cooloff_minutes: default_cooloff_minutes(),
            rsi_rally_min: default_rsi_rally_min(),
            rsi_exit_overbought: default_rsi_exit_overbought(),
            vol_spike_mult: default_vol_spike_mult(),
            enabled: false,
            zigzag_pct: None,
            price_tolerance: None,
        }
    }
}

impl ChannelConfig {
    /// Zone-builder parameters with this channel's overrides applied.
    pub fn zone_params(&self) -> ZoneParams {
        let mut params = ZoneParams::default();
        if let Some(v) = self.zigzag_pct {
            params.zigzag_pct = v;
        }
        if let Some(v) = self.price_tolerance {
            params.price_tolerance = v;
        }
        params
    }
}

/// Partial update applied by configuration commands.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfigUpdate {
    pub symbol: Option<String>,
    pub exchange: Option<String>,
    pub timeframes: Option<Vec<Timeframe>>,
    pub rally_score_needed: Option<u32>,
    pub cooloff_minutes: Option<u64>,
    pub rsi_rally_min: Option<f64>,
    pub rsi_exit_overbought: Option<f64>,
    pub vol_spike_mult: Option<f64>,
    pub enabled: Option<bool>,
    pub zigzag_pct: Option<f64>,
    pub price_tolerance: Option<f64>,
}

impl ChannelConfigUpdate {
    fn apply(&self, cfg: &mut ChannelConfig) {
        if let Some(v) = &self.symbol {
            cfg.symbol = v.clone();
        }
        if let Some(v) = &self.exchange {
            cfg.exchange = v.clone();
        }
        if let Some(v) = &self.timeframes {
            cfg.timeframes = v.clone();
        }
        if let Some(v) = self.rally_score_needed {
            cfg.rally_score_needed = v;
        }
        if let Some(v) = self.cooloff_minutes {
            cfg.cooloff_minutes = v;
        }
        if let Some(v) = self.rsi_rally_min {
            cfg.rsi_rally_min = v;
        }
        if let Some(v) = self.rsi_exit_overbought {
            cfg.rsi_exit_overbought = v;
        }
        if let Some(v) = self.vol_spike_mult {
            cfg.vol_spike_mult = v;
        }
        if let Some(v) = self.enabled {
            cfg.enabled = v;
        }
        if let Some(v) = self.zigzag_pct {
            cfg.zigzag_pct = Some(v);
        }
        if let Some(v) = self.price_tolerance {
            cfg.price_tolerance = Some(v);
        }
    }
}

/// JSON-file backed channel configuration.
pub struct ConfigStore {
    path: PathBuf,
    map: RwLock<FxHashMap<String, ChannelConfig>>,
}

impl ConfigStore {
    /// Open the store, tolerating a missing or corrupt file as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), %e, "corrupt config store, starting empty");
                    FxHashMap::default()
                }
            },
            Err(_) => FxHashMap::default(),
        };
        Self { path, map: RwLock::new(map) }
    }

    /// Read one channel's config, creating (and persisting) defaults on
    /// first access.
    pub async fn get(&self, key: ChannelKey) -> ChannelConfig {
        if let Some(cfg) = self.map.read().await.get(&key.to_string()) {
            return cfg.clone();
        }
        let mut map = self.map.write().await;
        let cfg = map.entry(key.to_string()).or_default().clone();
        if let Err(e) = self.persist(&map) {
            tracing::warn!(%key, %e, "failed to persist channel defaults");
        }
        cfg
    }

    /// Apply a partial update and return the merged config.
    pub async fn update(
        &self,
        key: ChannelKey,
        update: ChannelConfigUpdate,
    ) -> Result<ChannelConfig, MonitorError> {
        let mut map = self.map.write().await;
        let cfg = map.entry(key.to_string()).or_default();
        update.apply(cfg);
        let merged = cfg.clone();
        self.persist(&map)?;
        Ok(merged)
    }

    /// Channels whose stored config is enabled: the restore-on-boot set.
    pub async fn enabled_channels(&self) -> Vec<ChannelKey> {
        self.map
            .read()
            .await
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .filter_map(|(k, _)| k.parse().ok())
            .collect()
    }

    fn persist(&self, map: &FxHashMap<String, ChannelConfig>) -> Result<(), MonitorError> {
        let raw = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
