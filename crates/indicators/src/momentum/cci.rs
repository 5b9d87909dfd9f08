use std::collections::VecDeque;

use crate::error::{check_period, IndicatorError};

/// 商品通道指数
///
/// `TP = (H + L + C) / 3`，`CCI = (TP - SMA(TP)) / (0.015 * 平均绝对偏差)`，偏差为 0 时输出 0
#[derive(Debug, Clone)]
pub struct CciIndicator {
    period: usize,
    typical_prices: VecDeque<f64>,
}

impl CciIndicator {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        Ok(Self {
            period,
            typical_prices: VecDeque::with_capacity(period + 1),
        })
    }

    pub fn next(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let tp = (high + low + close) / 3.0;
        self.typical_prices.push_back(tp);
        if self.typical_prices.len() > self.period {
            self.typical_prices.pop_front();
        }
        if self.typical_prices.len() < self.period {
            return None;
        }
        let n = self.period as f64;
        let mean = self.typical_prices.iter().sum::<f64>() / n;
        let mean_dev = self.typical_prices.iter().map(|v| (v - mean).abs()).sum::<f64>() / n;
        if mean_dev > 0.0 {
            Some((tp - mean) / (0.015 * mean_dev))
        } else {
            Some(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_cci_known_value() {
        let mut cci = CciIndicator::new(3).unwrap();
        // TP 序列 1, 2, 3
        assert!(cci.next(1.0, 1.0, 1.0).is_none());
        assert!(cci.next(2.0, 2.0, 2.0).is_none());
        let v = cci.next(3.0, 3.0, 3.0).unwrap();
        // mean = 2, mean_dev = 2/3 => (3 - 2) / (0.015 * 2/3) = 100
        assert!(approx_eq!(f64, v, 100.0, epsilon = 1e-9));
    }

    #[test]
    fn test_cci_flat_is_zero() {
        let mut cci = CciIndicator::new(2).unwrap();
        cci.next(1.0, 1.0, 1.0);
        assert_eq!(cci.next(1.0, 1.0, 1.0), Some(0.0));
    }
}
