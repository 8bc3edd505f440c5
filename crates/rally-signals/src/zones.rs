//! Confluence zone building: merge Fibonacci, pivot, EMA and swing-extreme
//! price levels by proximity and score each merged zone by how many distinct
//! methods agree on it and how close it sits to the current price.

use crate::fib::{intelligent_fib, FibSet};
use crate::pivots::{pivots_from_daily, PivotLevels};
use rally_core::candle::CandleSeries;
use rally_core::IndicatorFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    Resistance,
    Support,
}

/// A clustered price level. Higher score = stronger confluence and closer to
/// the current price.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub level: f64,
    pub kind: ZoneKind,
    pub tags: Vec<String>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ZoneParams {
    pub zigzag_pct: f64,
    pub min_bars: usize,
    /// Window for the local high/low swing-extreme candidates.
    pub swing_window: usize,
    /// Relative distance under which candidate levels merge into one zone.
    pub price_tolerance: f64,
}

impl Default for ZoneParams {
    fn default() -> Self {
        Self {
            zigzag_pct: 0.03,
            min_bars: 5,
            swing_window: 50,
            price_tolerance: 0.002,
        }
    }
}

const MIN_CANDLES: usize = 30;

#[derive(Debug, Clone)]
struct Candidate {
    price: f64,
    tag: String,
    kind: ZoneKind,
}

/// Relative distance |a − b| / |a|.
fn proximity(a: f64, b: f64) -> f64 {
    (a - b).abs() / a.abs().max(1e-12)
}

fn group_avg(group: &[Candidate]) -> f64 {
    group.iter().map(|c| c.price).sum::<f64>() / group.len() as f64
}

/// Join each price-sorted candidate to the first group whose running average
/// lies within tolerance, else start a new group.
fn cluster(mut candidates: Vec<Candidate>, tolerance: f64) -> Vec<Vec<Candidate>> {
    candidates.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    for cand in candidates {
        let slot = groups
            .iter_mut()
            .find(|g| proximity(group_avg(g), cand.price) <= tolerance);
        match slot {
            Some(g) => g.push(cand),
            None => groups.push(vec![cand]),
        }
    }
    groups
}

fn score_group(group: &[Candidate], last_price: f64, tolerance: f64) -> Zone {
    let level = group_avg(group);

    let mut tags: Vec<String> = group.iter().map(|c| c.tag.clone()).collect();
    tags.sort();
    tags.dedup();

    let resistance = group.iter().filter(|c| c.kind == ZoneKind::Resistance).count();
    let kind = if resistance * 2 >= group.len() {
        ZoneKind::Resistance
    } else {
        ZoneKind::Support
    };

    let confluence = tags.len() as f64;
    let nearness = (1.0 - proximity(last_price, level) / tolerance).max(0.0);
    let score = ((confluence + nearness) * 1000.0).round() / 1000.0;

    Zone { level, kind, tags, score }
}

/// Merge all candidate levels into scored zones, strongest first.
///
/// Candidates: Fibonacci ratios in (0, 1], the six R/S pivot levels, each
/// EMA's current value, and the rolling-window high/low. Fewer than 30
/// candles yields no zones.
pub fn build_zones(
    frame: &IndicatorFrame,
    fib: Option<&FibSet>,
    pivots: Option<&PivotLevels>,
    params: &ZoneParams,
) -> Vec<Zone> {
    let n = frame.len();
    if n < MIN_CANDLES {
        return Vec::new();
    }
    let i = n - 1;
    let last_price = frame.candles[i].close;

    let side = |price: f64| {
        if price < last_price {
            ZoneKind::Support
        } else {
            ZoneKind::Resistance
        }
    };

    let mut candidates = Vec::new();

    if let Some(fib) = fib {
        for lv in &fib.levels {
            if lv.ratio > 0.0 && lv.ratio <= 1.0 {
                candidates.push(Candidate {
                    price: lv.price,
                    tag: format!("FIB_{}", lv.ratio),
                    kind: side(lv.price),
                });
            }
        }
    }

    if let Some(pv) = pivots {
        let named = [
            ("PIVOT_R1", pv.r1, ZoneKind::Resistance),
            ("PIVOT_R2", pv.r2, ZoneKind::Resistance),
            ("PIVOT_R3", pv.r3, ZoneKind::Resistance),
            ("PIVOT_S1", pv.s1, ZoneKind::Support),
            ("PIVOT_S2", pv.s2, ZoneKind::Support),
            ("PIVOT_S3", pv.s3, ZoneKind::Support),
        ];
        for (tag, price, kind) in named {
            candidates.push(Candidate { price, tag: tag.to_string(), kind });
        }
    }

    let emas = [
        ("EMA20", frame.ema20[i]),
        ("EMA50", frame.ema50[i]),
        ("EMA100", frame.ema100[i]),
        ("EMA200", frame.ema200[i]),
    ];
    for (tag, price) in emas {
        candidates.push(Candidate { price, tag: tag.to_string(), kind: side(price) });
    }

    let w = params.swing_window.max(10).min(n);
    let window = &frame.candles[n - w..];
    let loc_high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let loc_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    candidates.push(Candidate {
        price: loc_high,
        tag: "SWING_H".to_string(),
        kind: ZoneKind::Resistance,
    });
    candidates.push(Candidate {
        price: loc_low,
        tag: "SWING_L".to_string(),
        kind: ZoneKind::Support,
    });

    let mut zones: Vec<Zone> = cluster(candidates, params.price_tolerance)
        .iter()
        .map(|g| score_group(g, last_price, params.price_tolerance))
        .collect();

    zones.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| proximity(last_price, a.level).total_cmp(&proximity(last_price, b.level)))
    });
    zones
}

/// The on-demand zone pipeline: structure-aware Fibonacci from the frame's
/// own swings, floor pivots from a daily series when one is supplied, then
/// the confluence merge.
pub fn confluence_zones(
    frame: &IndicatorFrame,
    daily: Option<&CandleSeries>,
    params: &ZoneParams,
) -> Vec<Zone> {
    let fib = intelligent_fib(frame, params.zigzag_pct, params.min_bars);
    let pivots = daily.and_then(|d| pivots_from_daily(d));
    build_zones(frame, fib.as_ref(), pivots.as_ref(), params)
}
