//! End-to-end scenarios over synthetic candle series: a clean uptrend with a
//! late volume spike, and a dead-flat tape.

use chrono::{TimeZone, Utc};
use rally_core::{Candle, CandleSeries, IndicatorFrame};
use rally_signals::{confluence_zones, exit_triggers, rally_score, ZoneParams};

fn candle(i: usize, close: f64, volume: f64) -> Candle {
    Candle {
        ts: Utc.timestamp_opt(i as i64 * 14400, 0).unwrap(),
        open: close * 0.996,
        high: close * 1.003,
        low: close * 0.994,
        close,
        volume,
    }
}

/// 60 bars rising 1% per bar, volume spiking 2x on bar 55.
fn clean_uptrend() -> CandleSeries {
    (0..60)
        .map(|i| {
            let close = 100.0 * 1.01f64.powi(i as i32);
            let volume = if i == 55 { 20.0 } else { 10.0 };
            candle(i, close, volume)
        })
        .collect()
}

fn flat_tape(n: usize) -> CandleSeries {
    (0..n)
        .map(|i| Candle {
            ts: Utc.timestamp_opt(i as i64 * 14400, 0).unwrap(),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 10.0,
        })
        .collect()
}

#[test]
fn uptrend_scores_a_rally_by_the_volume_spike_bar() {
    let series: CandleSeries = clean_uptrend().into_iter().take(56).collect();
    let frame = IndicatorFrame::standard(series);
    let result = rally_score(&frame, 55.0, 1.5);

    assert!(result.score >= 3, "score {} reasons {:?}", result.score, result.reasons);
    assert_eq!(result.reasons.len() as u8, result.score);
    assert!(result.reasons.iter().any(|r| r.contains("ascending EMAs")));
    assert!(result.reasons.iter().any(|r| r.contains("volume spike")));
}

#[test]
fn uptrend_score_never_decreases_as_conditions_stack() {
    // the same frame scored with progressively easier thresholds can only
    // gain conditions, never lose them
    let frame = IndicatorFrame::standard(clean_uptrend());
    let strict = rally_score(&frame, 99.0, 10.0);
    let medium = rally_score(&frame, 55.0, 10.0);
    let loose = rally_score(&frame, 55.0, 0.1);
    assert!(strict.score <= medium.score);
    assert!(medium.score <= loose.score);
    assert!(loose.score <= 5);
}

#[test]
fn flat_tape_produces_no_signals_anywhere() {
    let series = flat_tape(20);
    let frame = IndicatorFrame::standard(series);

    let result = rally_score(&frame, 55.0, 1.5);
    assert_eq!(result.score, 0);
    assert!(result.reasons.is_empty());
    assert!(exit_triggers(&frame, 70.0).is_empty());

    // too short for the zone builder's minimum window
    let zones = confluence_zones(&frame, None, &ZoneParams::default());
    assert!(zones.is_empty());
}

#[test]
fn zone_pipeline_finds_confluence_on_a_trending_series() {
    let frame = IndicatorFrame::standard(clean_uptrend());
    let daily: CandleSeries = (0..5)
        .map(|i| {
            let c = 150.0 + i as f64;
            Candle {
                ts: Utc.timestamp_opt(i as i64 * 86400, 0).unwrap(),
                open: c - 1.0,
                high: c + 5.0,
                low: c - 5.0,
                close: c,
                volume: 100.0,
            }
        })
        .collect();

    let zones = confluence_zones(&frame, Some(&daily), &ZoneParams::default());
    assert!(!zones.is_empty());
    for pair in zones.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    // every zone carries at least one contributing method
    assert!(zones.iter().all(|z| !z.tags.is_empty()));
}
