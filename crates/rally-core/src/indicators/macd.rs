use super::ema::Ema;

/// One MACD observation: line = EMA(fast) − EMA(slow), signal = EMA of the
/// line, hist = line − signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub hist: f64,
}

/// Incremental MACD(fast, slow, signal).
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }

    /// Feed one close, return the current (line, signal, hist).
    pub fn update(&mut self, close: f64) -> MacdPoint {
        let line = self.fast.update(close) - self.slow.update(close);
        let signal = self.signal.update(line);
        MacdPoint {
            line,
            signal,
            hist: line - signal,
        }
    }
}

/// MACD(12, 26, 9)-style series, aligned 1:1 with the input.
pub fn macd_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    let mut macd = Macd::new(fast, slow, signal);
    closes.iter().map(|&c| macd.update(c)).collect()
}
