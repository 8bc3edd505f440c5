//! Thin OHLCV provider over Kraken's public OHLC endpoint, the default
//! exchange of the channel config. Interval granularity covers every
//! supported timeframe directly, so no resampling is needed.

use crate::provider::{OhlcvProvider, ProviderError};
use async_trait::async_trait;
use chrono::DateTime;
use rally_core::{Candle, CandleSeries, Timeframe};
use serde_json::Value;

pub struct KrakenProvider {
    client: reqwest::Client,
    base: String,
}

impl KrakenProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base: "https://api.kraken.com".to_string(),
        }
    }
}

impl Default for KrakenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OhlcvProvider for KrakenProvider {
    fn name(&self) -> &'static str {
        "kraken"
    }

    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries, ProviderError> {
        // "WIF/USD" → "WIFUSD"
        let pair: String = symbol.chars().filter(|c| *c != '/').collect();
        let interval = timeframe.minutes().to_string();

        let resp = self
            .client
            .get(format!("{}/0/public/OHLC", self.base))
            .query(&[("pair", pair.as_str()), ("interval", interval.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        match resp.status().as_u16() {
            403 | 451 => return Err(ProviderError::Geoblocked),
            s if s >= 400 => return Err(ProviderError::Transport(format!("http {s}"))),
            _ => {}
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))?;
        parse_ohlc(&body, limit)
    }
}

/// Parse Kraken's `{error: [...], result: {"<PAIR>": [[t,o,h,l,c,vwap,v,n]]}}`
/// shape into candles, keeping the most recent `limit` bars.
fn parse_ohlc(body: &Value, limit: usize) -> Result<CandleSeries, ProviderError> {
    if let Some(errors) = body.get("error").and_then(Value::as_array) {
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            if joined.contains("Unknown asset pair") {
                return Err(ProviderError::NoData);
            }
            return Err(ProviderError::BadResponse(joined));
        }
    }

    let result = body
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::BadResponse("missing result".to_string()))?;
    let rows = result
        .iter()
        .find(|(k, v)| k.as_str() != "last" && v.is_array())
        .and_then(|(_, v)| v.as_array())
        .ok_or(ProviderError::NoData)?;

    let mut out = Vec::with_capacity(rows.len().min(limit));
    let start = rows.len().saturating_sub(limit);
    for row in &rows[start..] {
        out.push(parse_row(row)?);
    }
    if out.is_empty() {
        return Err(ProviderError::NoData);
    }
    Ok(out)
}

fn parse_row(row: &Value) -> Result<Candle, ProviderError> {
    let cells = row
        .as_array()
        .filter(|r| r.len() >= 7)
        .ok_or_else(|| ProviderError::BadResponse("short ohlc row".to_string()))?;

    let secs = cells[0]
        .as_i64()
        .ok_or_else(|| ProviderError::BadResponse("bad timestamp".to_string()))?;
    let ts = DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ProviderError::BadResponse("bad timestamp".to_string()))?;

    let num = |idx: usize| -> Result<f64, ProviderError> {
        let cell = &cells[idx];
        cell.as_str()
            .and_then(|s| s.parse().ok())
            .or_else(|| cell.as_f64())
            .ok_or_else(|| ProviderError::BadResponse(format!("bad number at col {idx}")))
    };

    Ok(Candle {
        ts,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_response_shape() {
        let body: Value = serde_json::from_str(
            r#"{
                "error": [],
                "result": {
                    "WIFUSD": [
                        [1688671200, "1.95", "2.05", "1.90", "2.00", "1.98", "1000.5", 42],
                        [1688685600, "2.00", "2.20", "1.99", "2.15", "2.10", "2000.0", 77]
                    ],
                    "last": 1688685600
                }
            }"#,
        )
        .unwrap();

        let candles = parse_ohlc(&body, 300).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 2.00);
        assert_eq!(candles[1].high, 2.20);
        assert_eq!(candles[1].volume, 2000.0);
        assert!(candles[0].ts < candles[1].ts);
    }

    #[test]
    fn limit_keeps_the_most_recent_bars() {
        let body: Value = serde_json::from_str(
            r#"{
                "error": [],
                "result": {
                    "WIFUSD": [
                        [100, "1", "1", "1", "1", "1", "1", 1],
                        [200, "2", "2", "2", "2", "2", "2", 1],
                        [300, "3", "3", "3", "3", "3", "3", 1]
                    ],
                    "last": 300
                }
            }"#,
        )
        .unwrap();
        let candles = parse_ohlc(&body, 2).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 2.0);
    }

    #[test]
    fn unknown_pair_is_no_data() {
        let body: Value =
            serde_json::from_str(r#"{"error": ["EQuery:Unknown asset pair"], "result": {}}"#)
                .unwrap();
        assert!(matches!(parse_ohlc(&body, 10), Err(ProviderError::NoData)));
    }

    #[test]
    fn api_error_is_a_bad_response() {
        let body: Value =
            serde_json::from_str(r#"{"error": ["EGeneral:Too many requests"], "result": {}}"#)
                .unwrap();
        assert!(matches!(
            parse_ohlc(&body, 10),
            Err(ProviderError::BadResponse(_))
        ));
    }

    #[test]
    fn empty_result_is_no_data() {
        let body: Value =
            serde_json::from_str(r#"{"error": [], "result": {"last": 0}}"#).unwrap();
        assert!(matches!(parse_ohlc(&body, 10), Err(ProviderError::NoData)));
    }
}
