//! OHLCV provider boundary: an async fetch trait, a typed failure taxonomy,
//! and an ordered fallback chain that stops at the first success.

use async_trait::async_trait;
use rally_core::{CandleSeries, Timeframe};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Well-defined outcomes of one provider attempt. Anything that cannot be
/// expressed here is a bug in the provider impl, not something to swallow.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider answered but had no candles for the request.
    NoData,
    /// Regional block (HTTP 403/451). The caller can suggest an alternate
    /// provider or region.
    Geoblocked,
    /// The attempt exceeded the chain's fetch budget.
    Timeout,
    Transport(String),
    BadResponse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no data"),
            Self::Geoblocked => write!(f, "geoblocked (403), try another provider or region"),
            Self::Timeout => write!(f, "timed out"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::BadResponse(msg) => write!(f, "bad response: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[async_trait]
pub trait OhlcvProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch up to `limit` most-recent candles, oldest first.
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, ProviderError>;
}

/// One failed attempt, kept for the aggregate error message.
#[derive(Debug)]
pub struct FetchAttempt {
    pub provider: &'static str,
    pub error: ProviderError,
}

/// Every provider in the chain failed.
#[derive(Debug)]
pub struct ChainExhausted {
    pub attempts: Vec<FetchAttempt>,
}

impl fmt::Display for ChainExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all providers failed")?;
        for a in &self.attempts {
            write!(f, "; {}: {}", a.provider, a.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ChainExhausted {}

/// Ordered provider attempts with a per-attempt timeout. Stops at the first
/// provider that returns a non-empty series.
pub struct ProviderChain {
    providers: Vec<Arc<dyn OhlcvProvider>>,
    fetch_timeout: Duration,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn OhlcvProvider>>, fetch_timeout: Duration) -> Self {
        Self { providers, fetch_timeout }
    }

    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, ChainExhausted> {
        let mut attempts = Vec::new();
        for provider in &self.providers {
            let outcome =
                tokio::time::timeout(self.fetch_timeout, provider.fetch(symbol, timeframe, limit))
                    .await;
            let error = match outcome {
                Ok(Ok(series)) if !series.is_empty() => return Ok(series),
                Ok(Ok(_)) => ProviderError::NoData,
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout,
            };
            tracing::warn!(
                provider = provider.name(),
                %symbol,
                %timeframe,
                %error,
                "provider attempt failed"
            );
            attempts.push(FetchAttempt { provider: provider.name(), error });
        }
        Err(ChainExhausted { attempts })
    }
}
