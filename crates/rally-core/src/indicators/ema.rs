/// Exponential moving average, smoothing factor 2/(period+1), seeded by the
/// first observation. Produces a value for every input point.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            alpha: 2.0 / (period as f64 + 1.0),
            value: None,
        }
    }

    /// Feed one value, return the current EMA.
    pub fn update(&mut self, v: f64) -> f64 {
        let next = match self.value {
            None => v,
            Some(prev) => self.alpha * v + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// EMA over a whole series, aligned 1:1 with the input.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut ema = Ema::new(period);
    values.iter().map(|&v| ema.update(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_with_first_observation() {
        // span=3 → alpha = 0.5
        let out = ema_series(&[10.0, 11.0, 12.0, 13.0], 3);
        assert!((out[0] - 10.0).abs() < 1e-10);
        assert!((out[1] - 10.5).abs() < 1e-10);
        assert!((out[2] - 11.25).abs() < 1e-10);
        assert!((out[3] - 12.125).abs() < 1e-10);
    }

    #[test]
    fn period_one_is_the_identity() {
        let v = [3.0, -1.5, 42.0, 0.0, 7.25];
        assert_eq!(ema_series(&v, 1), v.to_vec());
    }

    #[test]
    fn empty_series_is_fine() {
        assert!(ema_series(&[], 20).is_empty());
        assert_eq!(Ema::new(20).value(), None);
    }
}
