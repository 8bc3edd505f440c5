use crate::candle::Candle;

/// Most recent pivot low: a low strictly below both neighbors. Falls back to
/// the minimum low over the trailing `lookback` window when no pivot exists.
/// `None` only for an empty series.
pub fn last_swing_low(candles: &[Candle], lookback: usize) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }

    let mut last_pivot = None;
    for i in 1..candles.len().saturating_sub(1) {
        let low = candles[i].low;
        if low < candles[i - 1].low && low < candles[i + 1].low {
            last_pivot = Some(low);
        }
    }
    if last_pivot.is_some() {
        return last_pivot;
    }

    let window = lookback.max(1).min(candles.len());
    candles[candles.len() - window..]
        .iter()
        .map(|c| c.low)
        .fold(f64::INFINITY, f64::min)
        .into()
}
