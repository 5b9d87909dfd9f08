use std::fmt;

use crate::error::{check_period, IndicatorError};

/// 指数移动平均
///
/// 以前 `period` 个值的简单平均作为种子，之后 `ema = (x - ema) * k + ema`，`k = 2 / (period + 1)`。
/// 种子形成前输出 `None`。
#[derive(Debug, Clone)]
pub struct EmaIndicator {
    period: usize,
    k: f64,
    count: usize,
    seed_sum: f64,
    current: Option<f64>,
}

impl EmaIndicator {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        Ok(Self {
            period,
            k: 2.0 / (period as f64 + 1.0),
            count: 0,
            seed_sum: 0.0,
            current: None,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn next(&mut self, value: f64) -> Option<f64> {
        match self.current {
            Some(prev) => {
                let ema = (value - prev) * self.k + prev;
                self.current = Some(ema);
            }
            None => {
                self.count += 1;
                self.seed_sum += value;
                if self.count == self.period {
                    self.current = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.current
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.seed_sum = 0.0;
        self.current = None;
    }
}

impl fmt::Display for EmaIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current {
            Some(v) => write!(f, "EMA({}): {:.5}", self.period, v),
            None => write!(f, "EMA({}): na", self.period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_ema_seeded_with_sma() {
        let mut ema = EmaIndicator::new(3).unwrap();
        assert_eq!(ema.next(1.0), None);
        assert_eq!(ema.next(2.0), None);
        // 种子 = (1 + 2 + 3) / 3
        assert!(approx_eq!(f64, ema.next(3.0).unwrap(), 2.0, epsilon = 1e-12));
        // k = 0.5: (6 - 2) * 0.5 + 2 = 4
        assert!(approx_eq!(f64, ema.next(6.0).unwrap(), 4.0, epsilon = 1e-12));
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(EmaIndicator::new(0).is_err());
    }

    #[test]
    fn test_reset() {
        let mut ema = EmaIndicator::new(1).unwrap();
        assert_eq!(ema.next(5.0), Some(5.0));
        ema.reset();
        assert_eq!(ema.value(), None);
    }
}
