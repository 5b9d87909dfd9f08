use serde::{Deserialize, Serialize};
use ta::indicators::{Maximum, Minimum};
use ta::Next;

use crate::error::{check_period, IndicatorError};
use crate::trend::SmaIndicator;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticOutput {
    pub k: f64,
    pub d: Option<f64>,
}

/// 随机指标 %K / %D
///
/// `%K = 100 * (C - LL) / (HH - LL)`，区间无波动时为 50；`%D = SMA(smooth)` of %K
#[derive(Debug, Clone)]
pub struct StochasticIndicator {
    period: usize,
    seen: usize,
    highest: Maximum,
    lowest: Minimum,
    d_line: SmaIndicator,
}

impl StochasticIndicator {
    pub fn new(period: usize, smooth: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        Ok(Self {
            period,
            seen: 0,
            highest: Maximum::new(period).map_err(|_| IndicatorError::InvalidPeriod(period))?,
            lowest: Minimum::new(period).map_err(|_| IndicatorError::InvalidPeriod(period))?,
            d_line: SmaIndicator::new(smooth)?,
        })
    }

    pub fn next(&mut self, high: f64, low: f64, close: f64) -> Option<StochasticOutput> {
        let hh = self.highest.next(high);
        let ll = self.lowest.next(low);
        self.seen += 1;
        if self.seen < self.period {
            return None;
        }
        let range = hh - ll;
        let k = if range > 0.0 {
            (100.0 * (close - ll) / range).clamp(0.0, 100.0)
        } else {
            50.0
        };
        let d = self.d_line.next(k);
        Some(StochasticOutput { k, d })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_stochastic_close_at_high() {
        let mut stoch = StochasticIndicator::new(3, 2).unwrap();
        assert!(stoch.next(10.0, 8.0, 9.0).is_none());
        assert!(stoch.next(11.0, 9.0, 10.0).is_none());
        let out = stoch.next(12.0, 10.0, 12.0).unwrap();
        // HH = 12, LL = 8
        assert!(approx_eq!(f64, out.k, 100.0, epsilon = 1e-9));
        assert!(out.d.is_none());
        let out = stoch.next(12.0, 10.0, 10.0).unwrap();
        // HH = 12, LL = 9 => 100 * 1 / 3
        assert!(approx_eq!(f64, out.k, 100.0 / 3.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, out.d.unwrap(), (100.0 + 100.0 / 3.0) / 2.0, epsilon = 1e-9));
    }

    #[test]
    fn test_stochastic_flat_range() {
        let mut stoch = StochasticIndicator::new(2, 1).unwrap();
        stoch.next(1.0, 1.0, 1.0);
        let out = stoch.next(1.0, 1.0, 1.0).unwrap();
        assert_eq!(out.k, 50.0);
        assert_eq!(out.d, Some(50.0));
    }
}
