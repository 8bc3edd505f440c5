//! Alert payloads and the delivery boundary. The core only produces
//! structured events; rendering and delivery retries belong to the
//! presentation layer behind [`AlertSink`].

use crate::store::ChannelKey;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rally_core::Timeframe;
use rally_signals::IgnitionSignal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RallyAlert {
    pub symbol: String,
    pub exchange: String,
    pub timeframe: Timeframe,
    pub price: f64,
    pub rsi: f64,
    pub score: u32,
    pub reasons: Vec<String>,
    pub bar_ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrectionAlert {
    pub symbol: String,
    pub exchange: String,
    pub timeframe: Timeframe,
    pub price: f64,
    pub rsi: f64,
    pub reasons: Vec<String>,
    pub bar_ts: DateTime<Utc>,
}

/// Everything the monitor can say to a channel.
#[derive(Debug, Clone, Serialize)]
pub enum ChannelEvent {
    Rally(RallyAlert),
    Correction(CorrectionAlert),
    Ignition {
        symbol: String,
        timeframe: Timeframe,
        signal: IgnitionSignal,
    },
    Killswitch {
        symbol: String,
        timeframe: Timeframe,
        bar_ts: DateTime<Utc>,
    },
    /// Transient failure or status line, e.g. a fetch error for one
    /// timeframe.
    Notice(String),
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, channel: ChannelKey, event: ChannelEvent);
}

/// Sink that renders events as structured log lines, the stand-in for a
/// real chat delivery layer.
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn deliver(&self, channel: ChannelKey, event: ChannelEvent) {
        match &event {
            ChannelEvent::Rally(a) => tracing::info!(
                %channel,
                symbol = %a.symbol,
                timeframe = %a.timeframe,
                price = a.price,
                rsi = a.rsi,
                score = a.score,
                reasons = ?a.reasons,
                "rally alert"
            ),
            ChannelEvent::Correction(a) => tracing::info!(
                %channel,
                symbol = %a.symbol,
                timeframe = %a.timeframe,
                price = a.price,
                rsi = a.rsi,
                reasons = ?a.reasons,
                "correction alert"
            ),
            ChannelEvent::Ignition { symbol, timeframe, signal } => tracing::info!(
                %channel,
                %symbol,
                %timeframe,
                rsi5 = signal.state.rsi5,
                entry = signal.levels.entry_ema9,
                stop = signal.levels.stop,
                tp1 = signal.levels.tp1,
                tp2 = signal.levels.tp2,
                "ignition alert"
            ),
            ChannelEvent::Killswitch { symbol, timeframe, .. } => {
                tracing::info!(%channel, %symbol, %timeframe, "killswitch alert")
            }
            ChannelEvent::Notice(text) => tracing::warn!(%channel, "{text}"),
        }
    }
}
