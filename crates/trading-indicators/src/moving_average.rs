//! Moving average indicators.

use trading_core::traits::Indicator;

/// Simple Moving Average (SMA).
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let period_f64 = self.period as f64;
        let mut sum: f64 = data[..self.period].iter().sum();
        let mut result = Vec::with_capacity(data.len() - self.period + 1);
        result.push(sum / period_f64);

        for i in self.period..data.len() {
            sum += data[i] - data[i - self.period];
            result.push(sum / period_f64);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential Moving Average (EMA), seeded with the SMA of the first window.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        ema_series(data, self.period)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

/// EMA over `data`, one value per input from index `period - 1` on.
pub(crate) fn ema_series(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = data[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(data.len() - period + 1);
    result.push(seed);

    let mut ema = seed;
    for &value in &data[period..] {
        ema = value * alpha + ema * (1.0 - alpha);
        result.push(ema);
    }

    result
}

/// Wilder's running average, seeded with the plain mean of the first window.
pub(crate) fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return vec![];
    }

    let period_f64 = period as f64;
    let mut avg = values[..period].iter().sum::<f64>() / period_f64;
    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(avg);

    for &value in &values[period..] {
        avg = (avg * (period_f64 - 1.0) + value) / period_f64;
        result.push(avg);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let sma = Sma::new(3);
        let result = sma.calculate(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(result, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ema_seed_and_decay() {
        let ema = Ema::new(3);
        let result = ema.calculate(&[2.0, 4.0, 6.0, 8.0]);
        assert_eq!(result.len(), 2);
        assert!((result[0] - 4.0).abs() < 1e-12);
        // alpha = 0.5: 8 * 0.5 + 4 * 0.5
        assert!((result[1] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_data() {
        assert!(Sma::new(5).calculate(&[1.0, 2.0]).is_empty());
        assert!(Ema::new(5).calculate(&[1.0, 2.0]).is_empty());
    }
}
