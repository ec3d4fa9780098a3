//! Volatility indicators.

use serde::{Deserialize, Serialize};
use trading_core::traits::Indicator;

use crate::moving_average::wilder_smooth;

/// Average True Range (ATR).
///
/// Measures market volatility by decomposing the entire range
/// of an asset price for that period.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// Create a new ATR indicator.
    ///
    /// Common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// Calculate ATR from OHLC data.
    pub fn calculate_ohlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
        let tr = true_ranges(high, low, close);
        wilder_smooth(&tr, self.period)
    }
}

impl Indicator for Atr {
    type Output = f64;

    /// Close-only approximation: true range collapses to the absolute close change.
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let tr: Vec<f64> = data.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        wilder_smooth(&tr, self.period)
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// True range for each bar after the first.
pub(crate) fn true_ranges(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let len = high.len().min(low.len()).min(close.len());
    (1..len)
        .map(|i| {
            let high_low = high[i] - low[i];
            let high_close = (high[i] - close[i - 1]).abs();
            let low_close = (low[i] - close[i - 1]).abs();
            high_low.max(high_close).max(low_close)
        })
        .collect()
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerOutput {
    /// Band width relative to the middle band.
    pub fn width(&self) -> f64 {
        if self.middle == 0.0 {
            return 0.0;
        }
        (self.upper - self.lower) / self.middle
    }
}

/// Bollinger Bands: SMA plus/minus a multiple of the population standard deviation.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn with_params(period: usize, std_dev_multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(std_dev_multiplier > 0.0, "Multiplier must be positive");
        Self {
            period,
            std_dev_multiplier,
        }
    }

    /// Calculate bands, oldest first.
    pub fn calculate(&self, data: &[f64]) -> Vec<BollingerOutput> {
        if data.len() < self.period {
            return vec![];
        }

        let period_f64 = self.period as f64;
        data.windows(self.period)
            .map(|window| {
                let mean = window.iter().sum::<f64>() / period_f64;
                let variance =
                    window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period_f64;
                let band = variance.sqrt() * self.std_dev_multiplier;
                BollingerOutput {
                    upper: mean + band,
                    middle: mean,
                    lower: mean - band,
                }
            })
            .collect()
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::with_params(20, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atr_ohlc() {
        let atr = Atr::new(2);
        let high = [11.0, 12.0, 13.0, 14.0];
        let low = [9.0, 10.0, 11.0, 12.0];
        let close = [10.0, 11.0, 12.0, 13.0];
        let values = atr.calculate_ohlc(&high, &low, &close);
        // every true range is 2.0
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_atr_reacts_to_range_expansion() {
        let atr = Atr::new(2);
        let high = [11.0, 11.0, 11.0, 20.0];
        let low = [10.0, 10.0, 10.0, 10.0];
        let close = [10.5, 10.5, 10.5, 15.0];
        let values = atr.calculate_ohlc(&high, &low, &close);
        assert!(values[1] > values[0]);
    }

    #[test]
    fn test_bollinger_bands() {
        let bb = BollingerBands::with_params(4, 2.0);
        let out = bb.calculate(&[2.0, 4.0, 4.0, 6.0]);
        assert_eq!(out.len(), 1);
        // mean 4, population std sqrt(2)
        let band = 2.0 * 2.0_f64.sqrt();
        assert!((out[0].middle - 4.0).abs() < 1e-12);
        assert!((out[0].upper - (4.0 + band)).abs() < 1e-12);
        assert!((out[0].lower - (4.0 - band)).abs() < 1e-12);
    }

    #[test]
    fn test_flat_series_has_zero_width() {
        let bb = BollingerBands::default();
        let out = bb.calculate(&[1.5; 25]);
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|o| o.width() == 0.0));
    }
}
