pub mod atr;
pub mod ema;
pub mod keltner;
pub mod macd;
pub mod rsi;
pub mod swing;

pub use atr::atr_series;
pub use ema::{ema_series, Ema};
pub use keltner::{keltner_series, KeltnerBands};
pub use macd::{macd_series, Macd, MacdPoint};
pub use rsi::{rsi_series, rsi_sma_series, Rsi};
pub use swing::last_swing_low;

/// Point slope over a fixed lookback: (v[t] - v[t-lookback]) / lookback.
/// `None` while fewer than `lookback` prior values exist.
pub fn slope_series(values: &[f64], lookback: usize) -> Vec<Option<f64>> {
    if lookback == 0 {
        return vec![Some(0.0); values.len()];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if i < lookback {
                None
            } else {
                Some((v - values[i - lookback]) / lookback as f64)
            }
        })
        .collect()
}

/// Simple rolling mean; `None` until the window is full.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Max over the `window` values strictly before each index (the prior
/// rolling high a breakout close must exceed). `None` until the prior
/// window is full.
pub fn prior_rolling_max(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i < window {
                None
            } else {
                values[i - window..i]
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max)
                    .into()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slope_is_rise_over_lookback() {
        let v = [1.0, 2.0, 4.0, 8.0];
        let s = slope_series(&v, 2);
        assert_eq!(s[0], None);
        assert_eq!(s[1], None);
        assert_eq!(s[2], Some(1.5));
        assert_eq!(s[3], Some(3.0));
    }

    #[test]
    fn rolling_mean_warms_up_then_tracks_window() {
        let v = [2.0, 4.0, 6.0, 8.0];
        let m = rolling_mean(&v, 2);
        assert_eq!(m, vec![None, Some(3.0), Some(5.0), Some(7.0)]);
    }

    #[test]
    fn prior_rolling_max_excludes_the_current_bar() {
        let v = [1.0, 5.0, 2.0, 3.0];
        let m = prior_rolling_max(&v, 2);
        assert_eq!(m[0], None);
        assert_eq!(m[1], None);
        // window {1, 5}: the 5 at index 1 is visible, the current 2 is not
        assert_eq!(m[2], Some(5.0));
        assert_eq!(m[3], Some(5.0));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(slope_series(&[], 5).is_empty());
        assert!(rolling_mean(&[], 20).is_empty());
        assert!(prior_rolling_max(&[], 20).is_empty());
    }
}
