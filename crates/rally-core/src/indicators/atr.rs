use super::rolling_mean;
use crate::candle::Candle;

/// True range of one bar given the previous close:
/// max(high − low, |high − prev_close|, |low − prev_close|).
/// The first bar has no previous close and degrades to high − low.
pub fn true_range(prev_close: Option<f64>, high: f64, low: f64) -> f64 {
    match prev_close {
        Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
        None => high - low,
    }
}

/// ATR as a simple rolling mean of true range over `period` bars.
/// `None` until the window is full.
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut prev_close = None;
    let tr: Vec<f64> = candles
        .iter()
        .map(|c| {
            let t = true_range(prev_close, c.high, c.low);
            prev_close = Some(c.close);
            t
        })
        .collect();
    rolling_mean(&tr, period)
}
