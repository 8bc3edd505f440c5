use super::{atr_series, ema_series};
use crate::candle::Candle;

/// Keltner channel: EMA midline with bands at a multiple of ATR.
/// Bands are undefined while ATR is still warming up.
#[derive(Debug, Clone)]
pub struct KeltnerBands {
    pub mid: Vec<f64>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn keltner_series(candles: &[Candle], ema_len: usize, atr_len: usize, mult: f64) -> KeltnerBands {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let mid = ema_series(&closes, ema_len);
    let atr = atr_series(candles, atr_len);

    let upper = mid
        .iter()
        .zip(&atr)
        .map(|(m, a)| a.map(|a| m + a * mult))
        .collect();
    let lower = mid
        .iter()
        .zip(&atr)
        .map(|(m, a)| a.map(|a| m - a * mult))
        .collect();

    KeltnerBands { mid, upper, lower }
}
