use super::rolling_mean;

/// RSI with Wilder-style exponential smoothing of gains/losses
/// (smoothing factor 1/period, seeded by the first gain/loss pair).
///
/// Leading bars with no delta yet report the neutral 50. When the average
/// loss is zero the value clamps to 100 (or stays 50 if the average gain is
/// also zero), so a division fault is impossible.
#[derive(Debug, Clone)]
pub struct Rsi {
    alpha: f64,
    prev_close: Option<f64>,
    avg_gain: f64,
    avg_loss: f64,
    seeded: bool,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            alpha: 1.0 / period.max(1) as f64,
            prev_close: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            seeded: false,
        }
    }

    /// Feed one close, return the current RSI in [0, 100].
    pub fn update(&mut self, close: f64) -> f64 {
        let Some(prev) = self.prev_close else {
            self.prev_close = Some(close);
            return 50.0;
        };
        self.prev_close = Some(close);

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if !self.seeded {
            self.avg_gain = gain;
            self.avg_loss = loss;
            self.seeded = true;
        } else {
            self.avg_gain = self.alpha * gain + (1.0 - self.alpha) * self.avg_gain;
            self.avg_loss = self.alpha * loss + (1.0 - self.alpha) * self.avg_loss;
        }

        if self.avg_loss == 0.0 {
            if self.avg_gain == 0.0 {
                50.0
            } else {
                100.0
            }
        } else {
            let rs = self.avg_gain / self.avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        }
    }
}

/// Wilder-smoothed RSI over a whole series, aligned 1:1 with the input.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut rsi = Rsi::new(period);
    closes.iter().map(|&c| rsi.update(c)).collect()
}

/// Fast RSI variant: simple rolling mean of gains/losses over the window
/// (the RSI-5 used by the aggressive detector). Undefined leading values
/// fill with the neutral 50.
pub fn rsi_sma_series(closes: &[f64], period: usize) -> Vec<f64> {
    if closes.is_empty() {
        return Vec::new();
    }
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(0.0);
    losses.push(0.0);
    for w in closes.windows(2) {
        let change = w[1] - w[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|pair| match pair {
            (Some(g), Some(l)) if *l > 0.0 => {
                let rs = g / l;
                100.0 - 100.0 / (1.0 + rs)
            }
            (Some(g), Some(_)) if *g > 0.0 => 100.0,
            _ => 50.0,
        })
        .collect()
}
