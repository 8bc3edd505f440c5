use chrono::{DateTime, Utc};
use rally_core::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingKind {
    High,
    Low,
}

/// One confirmed (or still-extending) zigzag pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swing {
    pub ts: DateTime<Utc>,
    pub price: f64,
    pub kind: SwingKind,
}

/// Percentage-threshold zigzag swing detection.
///
/// A new low swing is confirmed once price drops at least `pct` from the
/// running pivot high and at least `min_bars` candles have passed since that
/// pivot; symmetric for high swings. While unconfirmed, a more extreme
/// high/low extends the current pivot in place. Series shorter than 10
/// candles yield no swings.
pub fn find_swings_zigzag(candles: &[Candle], pct: f64, min_bars: usize) -> Vec<Swing> {
    if candles.len() < 10 {
        return Vec::new();
    }

    let mut swings = Vec::new();
    let mut pivot_idx = 0usize;
    let mut pivot_price = candles[0].high;
    let mut pivot_kind = SwingKind::High;
    swings.push(Swing {
        ts: candles[0].ts,
        price: pivot_price,
        kind: pivot_kind,
    });

    for (i, c) in candles.iter().enumerate().skip(1) {
        match pivot_kind {
            SwingKind::High => {
                let drop = (pivot_price - c.low) / pivot_price;
                if drop >= pct && i - pivot_idx >= min_bars {
                    pivot_idx = i;
                    pivot_price = c.low;
                    pivot_kind = SwingKind::Low;
                    swings.push(Swing { ts: c.ts, price: c.low, kind: SwingKind::Low });
                } else if c.high > pivot_price {
                    // extend the running high pivot in place
                    pivot_idx = i;
                    pivot_price = c.high;
                    *swings.last_mut().unwrap() =
                        Swing { ts: c.ts, price: c.high, kind: SwingKind::High };
                }
            }
            SwingKind::Low => {
                let rise = (c.high - pivot_price) / pivot_price;
                if rise >= pct && i - pivot_idx >= min_bars {
                    pivot_idx = i;
                    pivot_price = c.high;
                    pivot_kind = SwingKind::High;
                    swings.push(Swing { ts: c.ts, price: c.high, kind: SwingKind::High });
                } else if c.low < pivot_price {
                    pivot_idx = i;
                    pivot_price = c.low;
                    *swings.last_mut().unwrap() =
                        Swing { ts: c.ts, price: c.low, kind: SwingKind::Low };
                }
            }
        }
    }

    swings
}
