//! Trend strength indicators.

use crate::moving_average::wilder_smooth;
use crate::volatility::true_ranges;

/// Average Directional Index (ADX), Wilder's trend-strength measure in `[0, 100]`.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
}

impl Adx {
    /// Create a new ADX indicator. Common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// Calculate ADX from OHLC data, oldest first.
    pub fn calculate_ohlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
        let len = high.len().min(low.len()).min(close.len());
        if len < self.period() {
            return vec![];
        }

        let (plus_dm, minus_dm): (Vec<f64>, Vec<f64>) = (1..len)
            .map(|i| {
                let up = high[i] - high[i - 1];
                let down = low[i - 1] - low[i];
                let plus = if up > down && up > 0.0 { up } else { 0.0 };
                let minus = if down > up && down > 0.0 { down } else { 0.0 };
                (plus, minus)
            })
            .unzip();

        // Wilder's running sums share the running-average recurrence up to a constant factor,
        // which cancels in the DI ratios.
        let tr = wilder_smooth(&true_ranges(high, low, close), self.period);
        let plus = wilder_smooth(&plus_dm, self.period);
        let minus = wilder_smooth(&minus_dm, self.period);

        let dx: Vec<f64> = tr
            .iter()
            .zip(plus.iter().zip(&minus))
            .map(|(&tr, (&p, &m))| {
                if tr == 0.0 {
                    return 0.0;
                }
                let plus_di = 100.0 * p / tr;
                let minus_di = 100.0 * m / tr;
                let sum = plus_di + minus_di;
                if sum == 0.0 {
                    0.0
                } else {
                    100.0 * (plus_di - minus_di).abs() / sum
                }
            })
            .collect();

        wilder_smooth(&dx, self.period)
    }

    /// Minimum bars required.
    pub fn period(&self) -> usize {
        2 * self.period
    }
}

impl Default for Adx {
    fn default() -> Self {
        Self::new(14)
    }
}
