//! Aggressive single-shot rally classifier: ignition entry and killswitch
//! exit over EMA9/21, RSI5, Keltner(20,14) and rolling volume/high windows.

use chrono::{DateTime, Utc};
use rally_core::candle::Candle;
use rally_core::indicators::{
    atr_series, ema_series, keltner_series, last_swing_low, prior_rolling_max, rolling_mean,
    rsi_sma_series, slope_series,
};
use serde::Serialize;

/// Bars needed to evaluate the prior 20-bar breakout window.
const MIN_BARS: usize = 21;
const SWING_LOOKBACK: usize = 12;

/// Snapshot of the key indicator values on the evaluated bar.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IgnitionState {
    pub close: f64,
    pub ema9: f64,
    pub ema21: f64,
    pub rsi5: f64,
    pub atr14: f64,
}

/// Suggested trade levels computed on ignition.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TradeLevels {
    /// Pullback entry at the EMA9.
    pub entry_ema9: f64,
    /// Entry at a 38.2% retracement from the recent 10-bar low.
    pub entry_382: f64,
    pub stop: f64,
    /// 1R target.
    pub tp1: f64,
    /// 1.272R target.
    pub tp2: f64,
}

/// Result of one detector pass. Sub-condition booleans are kept for
/// diagnostics; `ignition` and `killswitch` are the decisions.
#[derive(Debug, Clone, Serialize)]
pub struct IgnitionSignal {
    pub ignition: bool,
    pub killswitch: bool,
    pub trend_ok: bool,
    pub breakout_ok: bool,
    pub momentum_ok: bool,
    pub volume_ok: bool,
    pub state: IgnitionState,
    pub bar_ts: DateTime<Utc>,
    pub levels: TradeLevels,
}

/// Classify the latest bar. Pure and deterministic: same series in, same
/// signal out. Returns `None` when the series is too short to evaluate the
/// breakout window.
pub fn detect_ignition(candles: &[Candle], keltner_mult: f64) -> Option<IgnitionSignal> {
    let n = candles.len();
    if n < MIN_BARS {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    let ema9 = ema_series(&closes, 9);
    let ema21 = ema_series(&closes, 21);
    let rsi5 = rsi_sma_series(&closes, 5);
    let ema9_slope = slope_series(&ema9, 5);
    let ema21_slope = slope_series(&ema21, 5);
    let vol_ma20 = rolling_mean(&volumes, 20);
    let prior_high20 = prior_rolling_max(&highs, 20);
    let keltner = keltner_series(candles, 20, 14, keltner_mult);
    let atr14 = atr_series(candles, 14);

    let i = n - 1;
    let last = &candles[i];

    let trend_ok = ema9[i] > ema21[i]
        && ema9_slope[i].is_some_and(|s| s > 0.0)
        && ema21_slope[i].is_some_and(|s| s > 0.0);
    let breakout_ok = prior_high20[i].is_some_and(|h| last.close > h);
    let momentum_ok = rsi5[i] >= 70.0;
    let volume_ok = vol_ma20[i].is_some_and(|v| last.volume >= 1.5 * v);

    let ignition = trend_ok && breakout_ok && momentum_ok && volume_ok;

    // Killswitch over the trailing 5 bars (current included).
    let win = n - 5..n;
    let above_upper = win
        .clone()
        .filter(|&j| keltner.upper[j].is_some_and(|u| closes[j] > u))
        .count();
    let rsi_peak = win.clone().map(|j| rsi5[j]).fold(f64::NEG_INFINITY, f64::max);
    let rsi_hook = rsi_peak > 85.0 && rsi5[i] < 70.0;
    let close_below_ema9 = last.close < ema9[i];
    let swing_low = last_swing_low(candles, SWING_LOOKBACK).unwrap_or(last.low);
    let structure_break = last.low < swing_low;

    let killswitch = (above_upper >= 3 && close_below_ema9) || rsi_hook || structure_break;

    let atr = atr14[i].unwrap_or(0.0);
    let entry_ema9 = ema9[i];
    let recent_low = candles[n - 10..n - 1]
        .iter()
        .map(|c| c.low)
        .fold(f64::INFINITY, f64::min);
    let entry_382 = last.close - 0.382 * (last.close - recent_low);
    let stop = swing_low.min(entry_ema9 - atr);
    let risk = entry_ema9 - stop;

    Some(IgnitionSignal {
        ignition,
        killswitch,
        trend_ok,
        breakout_ok,
        momentum_ok,
        volume_ok,
        state: IgnitionState {
            close: last.close,
            ema9: ema9[i],
            ema21: ema21[i],
            rsi5: rsi5[i],
            atr14: atr,
        },
        bar_ts: last.ts,
        levels: TradeLevels {
            entry_ema9,
            entry_382,
            stop,
            tp1: entry_ema9 + risk,
            tp2: entry_ema9 + 1.272 * risk,
        },
    })
}
