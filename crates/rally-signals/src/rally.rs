//! Rally scoring and correction triggers over an indicator frame.
//!
//! Both functions are pure; the caller decides whether a score or trigger
//! list justifies an alert.

use rally_core::IndicatorFrame;

/// Rally score 0..=5 with one human-readable reason per satisfied condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RallyScore {
    pub score: u8,
    pub reasons: Vec<String>,
}

/// Score the latest bar against five independent rally conditions:
/// bullish EMA stacking, ascending EMAs, strengthening RSI, MACD impulse,
/// and a volume spike. Frames shorter than 3 bars score zero.
pub fn rally_score(frame: &IndicatorFrame, rsi_min: f64, vol_mult: f64) -> RallyScore {
    let n = frame.len();
    if n < 3 {
        return RallyScore::default();
    }
    let c = frame.row(n - 1);
    let p = frame.row(n - 2);

    let mut reasons = Vec::new();

    if c.candle.close > c.ema50 && c.ema50 > c.ema200 {
        reasons.push("close > EMA50 > EMA200".to_string());
    }
    if c.ema20 > c.ema50 && c.ema20 > p.ema20 && c.ema50 > p.ema50 {
        reasons.push("ascending EMAs 20/50".to_string());
    }
    if c.rsi >= rsi_min && c.rsi > p.rsi {
        reasons.push(format!("RSI strong {:.1}", c.rsi));
    }
    if c.macd > c.macd_signal && c.macd_hist > p.macd_hist {
        reasons.push("MACD impulse".to_string());
    }
    if let Some(vol_ma) = c.vol_ma20 {
        if c.candle.volume > vol_ma * vol_mult {
            reasons.push("volume spike".to_string());
        }
    }

    RallyScore {
        score: reasons.len() as u8,
        reasons,
    }
}

/// Correction triggers on the latest bar. Order-independent, no cap.
pub fn exit_triggers(frame: &IndicatorFrame, rsi_over: f64) -> Vec<String> {
    let n = frame.len();
    if n < 3 {
        return Vec::new();
    }
    let c = frame.row(n - 1);
    let p = frame.row(n - 2);
    let pp = frame.row(n - 3);

    let mut triggers = Vec::new();

    if c.rsi >= rsi_over && c.rsi < p.rsi {
        triggers.push("RSI leaving overbought".to_string());
    }
    if c.macd_hist < p.macd_hist && p.macd_hist < pp.macd_hist {
        triggers.push("MACD hist falling 3 bars".to_string());
    }
    if c.candle.close < c.ema20 {
        triggers.push("close below EMA20".to_string());
    }
    let long_wick = |w: Option<f64>| w.is_some_and(|w| w > 0.6);
    if long_wick(c.wick_top) || long_wick(p.wick_top) {
        triggers.push("long upper wicks".to_string());
    }
    triggers
}
