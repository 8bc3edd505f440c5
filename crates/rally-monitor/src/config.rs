use std::env;
use std::path::PathBuf;

/// Service configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Channel configuration store (JSON).
    pub state_path: PathBuf,
    /// Alert dedup store (JSON).
    pub alerts_path: PathBuf,
    /// Ignition-watch channel state (JSON).
    pub watch_state_path: PathBuf,

    /// Seconds between scan cycles of an enabled channel.
    pub cycle_secs: u64,
    /// Re-check interval while a channel is disabled.
    pub disabled_poll_secs: u64,
    /// Backoff after an unexpected scan-loop failure.
    pub backoff_secs: u64,
    /// Poll interval of the ignition-watch worker.
    pub watch_poll_secs: u64,

    /// Per-provider fetch budget.
    pub fetch_timeout_secs: u64,
    /// Candles requested per scan fetch.
    pub fetch_limit: usize,
    /// Candles requested per ignition-watch fetch.
    pub watch_fetch_limit: usize,

    /// Zones reported by the on-demand confluence call.
    pub top_zones: usize,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_str(name, default))
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        Self {
            state_path: env_path("RALLY_STATE_PATH", "state.json"),
            alerts_path: env_path("RALLY_ALERTS_PATH", "alerts.json"),
            watch_state_path: env_path("RALLY_WATCH_STATE_PATH", "watch_state.json"),
            cycle_secs: env_u64("RALLY_CYCLE_SECS", 300),
            disabled_poll_secs: env_u64("RALLY_DISABLED_POLL_SECS", 5),
            backoff_secs: env_u64("RALLY_BACKOFF_SECS", 10),
            watch_poll_secs: env_u64("RALLY_WATCH_POLL_SECS", 60),
            fetch_timeout_secs: env_u64("RALLY_FETCH_TIMEOUT_SECS", 6),
            fetch_limit: env_usize("RALLY_FETCH_LIMIT", 300),
            watch_fetch_limit: env_usize("RALLY_WATCH_FETCH_LIMIT", 600),
            top_zones: env_usize("RALLY_TOP_ZONES", 6),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
