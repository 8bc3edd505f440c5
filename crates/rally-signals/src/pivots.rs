use rally_core::candle::Candle;

/// Classic floor-trader pivot levels from one prior period's high/low/close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotLevels {
    pub p: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

pub fn classic_pivots(h: f64, l: f64, c: f64) -> PivotLevels {
    let p = (h + l + c) / 3.0;
    PivotLevels {
        p,
        r1: 2.0 * p - l,
        r2: p + (h - l),
        r3: h + 2.0 * (p - l),
        s1: 2.0 * p - h,
        s2: p - (h - l),
        s3: l - 2.0 * (h - p),
    }
}

/// Pivots from the last fully-closed daily candle: the penultimate row, since
/// the final row may still be forming. `None` with fewer than 2 candles.
pub fn pivots_from_daily(daily: &[Candle]) -> Option<PivotLevels> {
    if daily.len() < 2 {
        return None;
    }
    let row = &daily[daily.len() - 2];
    Some(classic_pivots(row.high, row.low, row.close))
}
