use crate::candle::{Candle, CandleSeries};
use crate::indicators::{ema_series, macd_series, rolling_mean, rsi_series};

/// A candle series enriched with the standard indicator columns used by the
/// rally scorer and the zone builder.
///
/// Every computed series has the same length and alignment as the source
/// candles; entries that lack enough lookback are `None`, never a crash.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub candles: CandleSeries,
    pub ema20: Vec<f64>,
    pub ema50: Vec<f64>,
    pub ema100: Vec<f64>,
    pub ema200: Vec<f64>,
    pub rsi14: Vec<f64>,
    pub macd: Vec<f64>,
    pub macd_signal: Vec<f64>,
    pub macd_hist: Vec<f64>,
    pub vol_ma20: Vec<Option<f64>>,
    pub wick_top: Vec<Option<f64>>,
}

/// Flat copy of one frame row, the unit the scorer reasons about.
#[derive(Debug, Clone, Copy)]
pub struct FrameRow {
    pub candle: Candle,
    pub ema20: f64,
    pub ema50: f64,
    pub ema100: f64,
    pub ema200: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,
    pub vol_ma20: Option<f64>,
    pub wick_top: Option<f64>,
}

impl IndicatorFrame {
    /// Enrich a candle series with ema20/50/100/200, rsi14, MACD(12,26,9),
    /// vol_ma20 and the upper-wick ratio.
    pub fn standard(candles: CandleSeries) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let macd = macd_series(&closes, 12, 26, 9);
        let wick_top = candles.iter().map(|c| upper_wick_ratio(c)).collect();

        Self {
            ema20: ema_series(&closes, 20),
            ema50: ema_series(&closes, 50),
            ema100: ema_series(&closes, 100),
            ema200: ema_series(&closes, 200),
            rsi14: rsi_series(&closes, 14),
            macd: macd.iter().map(|p| p.line).collect(),
            macd_signal: macd.iter().map(|p| p.signal).collect(),
            macd_hist: macd.iter().map(|p| p.hist).collect(),
            vol_ma20: rolling_mean(&volumes, 20),
            wick_top,
            candles,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn row(&self, idx: usize) -> FrameRow {
        FrameRow {
            candle: self.candles[idx],
            ema20: self.ema20[idx],
            ema50: self.ema50[idx],
            ema100: self.ema100[idx],
            ema200: self.ema200[idx],
            rsi: self.rsi14[idx],
            macd: self.macd[idx],
            macd_signal: self.macd_signal[idx],
            macd_hist: self.macd_hist[idx],
            vol_ma20: self.vol_ma20[idx],
            wick_top: self.wick_top[idx],
        }
    }

    /// The latest row, if any.
    pub fn last(&self) -> Option<FrameRow> {
        self.len().checked_sub(1).map(|i| self.row(i))
    }
}

/// (high − max(open, close)) / (high − low); `None` on a zero-range bar.
fn upper_wick_ratio(c: &Candle) -> Option<f64> {
    let range = c.high - c.low;
    if range <= 0.0 {
        return None;
    }
    Some((c.high - c.open.max(c.close)) / range)
}
