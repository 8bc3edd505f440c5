//! Two independent alert gates.
//!
//! Bar dedup: at most one alert per (channel, symbol, timeframe, kind) per
//! bar timestamp; re-polling a still-open bar never re-alerts.
//!
//! Cooloff: minimum wall-clock spacing between alerts for a channel and
//! timeframe, regardless of which bar triggered them. The two gates are
//! deliberately uncoupled.

use crate::store::ChannelKey;
use chrono::{DateTime, Utc};
use rally_core::Timeframe;
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    Rally,
    Exit,
    Ignition,
    Killswitch,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Rally => "RALLY",
            AlertKind::Exit => "EXIT",
            AlertKind::Ignition => "IGN",
            AlertKind::Killswitch => "KILL",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite dedup key: `guild:channel:SYMBOL:timeframe:KIND`.
pub fn dedup_key(key: ChannelKey, symbol: &str, timeframe: Timeframe, kind: AlertKind) -> String {
    format!("{key}:{symbol}:{timeframe}:{kind}")
}

/// Last alerted bar timestamp per composite key, persisted as RFC 3339
/// strings. Persistence is best effort: a failed write is logged and the
/// in-memory state stays authoritative.
pub struct AlertDedupStore {
    path: Option<PathBuf>,
    map: Mutex<FxHashMap<String, String>>,
}

impl AlertDedupStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path: Some(path), map: Mutex::new(map) }
    }

    pub fn in_memory() -> Self {
        Self { path: None, map: Mutex::new(FxHashMap::default()) }
    }

    /// True (suppress) if `key` already alerted for exactly this bar;
    /// otherwise record the bar and return false (allow).
    pub async fn seen(&self, key: &str, bar_ts: DateTime<Utc>) -> bool {
        let stamp = bar_ts.to_rfc3339();
        let mut map = self.map.lock().await;
        if map.get(key) == Some(&stamp) {
            return true;
        }
        map.insert(key.to_string(), stamp);
        if let Some(path) = &self.path {
            let raw = serde_json::to_string_pretty(&*map).unwrap_or_default();
            if let Err(e) = std::fs::write(path, raw) {
                tracing::warn!(path = %path.display(), %e, "failed to persist alert dedup state");
            }
        }
        false
    }
}

/// Monotonic per-key cooloff timer.
#[derive(Default)]
pub struct CooloffGate {
    map: Mutex<FxHashMap<String, Instant>>,
}

impl CooloffGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no alert was marked for `key` within `cooloff`.
    pub async fn ready(&self, key: &str, cooloff: Duration) -> bool {
        match self.map.lock().await.get(key) {
            Some(last) => last.elapsed() > cooloff,
            None => true,
        }
    }

    pub async fn mark(&self, key: &str) {
        self.map.lock().await.insert(key.to_string(), Instant::now());
    }
}
