use crate::provider::ChainExhausted;
use rally_core::Timeframe;

/// Unified error type for the monitor service. Failures degrade to channel
/// notices at the scan-loop boundary; nothing here crosses a timeframe or
/// channel boundary.
#[derive(Debug)]
pub enum MonitorError {
    /// Provider returned no or insufficient candles for one timeframe.
    NoData { symbol: String, timeframe: Timeframe },
    Provider(ChainExhausted),
    /// The channel has no usable symbol/exchange configured.
    ConfigMissing(String),
    Store(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoData { symbol, timeframe } => write!(f, "{symbol} {timeframe}: no data"),
            Self::Provider(e) => write!(f, "fetch failed: {e}"),
            Self::ConfigMissing(msg) => {
                write!(f, "channel not configured: {msg}; set a symbol and exchange first")
            }
            Self::Store(msg) => write!(f, "state store: {msg}"),
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Json(e) => write!(f, "json: {e}"),
        }
    }
}

impl std::error::Error for MonitorError {}

impl From<ChainExhausted> for MonitorError {
    fn from(e: ChainExhausted) -> Self {
        Self::Provider(e)
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
