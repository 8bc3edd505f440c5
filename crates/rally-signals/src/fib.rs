use crate::swings::{find_swings_zigzag, Swing, SwingKind};
use rally_core::IndicatorFrame;

/// Direction of the measured leg: retracements of an up move are measured
/// down from its top, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FibDirection {
    Up,
    Down,
}

/// One computed retracement/extension level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Fibonacci level set between the two most recent opposing swings.
#[derive(Debug, Clone, PartialEq)]
pub struct FibSet {
    pub direction: FibDirection,
    /// Where the measured leg started.
    pub base: f64,
    /// Where the measured leg ended; ratio 0 sits here.
    pub anchor: f64,
    pub levels: Vec<FibLevel>,
}

pub const FIB_RATIOS: [f64; 9] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0, 1.272, 1.618];

impl FibSet {
    /// Level for a ratio, if it was computed.
    pub fn level(&self, ratio: f64) -> Option<f64> {
        self.levels
            .iter()
            .find(|l| (l.ratio - ratio).abs() < 1e-9)
            .map(|l| l.price)
    }
}

/// Build retracement levels between a swing high and a swing low.
///
/// `Up` measures the low→high leg and projects levels down from the high;
/// `Down` measures high→low and projects up from the low. Without a hint the
/// direction defaults to `Up`.
pub fn fib_from_swings(last_high: f64, last_low: f64, hint: Option<FibDirection>) -> FibSet {
    let direction = hint.unwrap_or(FibDirection::Up);

    let (base, anchor) = match direction {
        FibDirection::Up => (last_low, last_high),
        FibDirection::Down => (last_high, last_low),
    };
    let span = (last_high - last_low).abs();

    let levels = FIB_RATIOS
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: match direction {
                FibDirection::Up => anchor - span * ratio,
                FibDirection::Down => anchor + span * ratio,
            },
        })
        .collect();

    FibSet { direction, base, anchor, levels }
}

/// Structure-aware Fibonacci set from the frame's zigzag swings.
///
/// Direction comes from trend structure when it is unambiguous (close above
/// both EMA20 and EMA50 with RSI above 50, or the mirror), otherwise from
/// the most recent confirmed leg. `None` when the frame is shorter than 50
/// bars or fewer than two opposing swings exist.
pub fn intelligent_fib(frame: &IndicatorFrame, zigzag_pct: f64, min_bars: usize) -> Option<FibSet> {
    if frame.len() < 50 {
        return None;
    }

    let swings = find_swings_zigzag(&frame.candles, zigzag_pct, min_bars);
    let (last, prev) = last_opposing_pair(&swings)?;

    let i = frame.len() - 1;
    let close = frame.candles[i].close;
    let (ema20, ema50, rsi) = (frame.ema20[i], frame.ema50[i], frame.rsi14[i]);

    let hint = if close > ema20 && ema20 > ema50 && rsi > 50.0 {
        Some(FibDirection::Up)
    } else if close < ema20 && ema20 < ema50 && rsi < 50.0 {
        Some(FibDirection::Down)
    } else {
        // fall back to the direction of the last confirmed leg
        Some(match last.kind {
            SwingKind::High => FibDirection::Up,
            SwingKind::Low => FibDirection::Down,
        })
    };

    let (last_high, last_low) = match last.kind {
        SwingKind::High => (last.price, prev.price),
        SwingKind::Low => (prev.price, last.price),
    };

    Some(fib_from_swings(last_high, last_low, hint))
}

fn last_opposing_pair(swings: &[Swing]) -> Option<(Swing, Swing)> {
    let last = *swings.last()?;
    let prev = swings[..swings.len() - 1]
        .iter()
        .rev()
        .find(|s| s.kind != last.kind)?;
    Some((last, *prev))
}
