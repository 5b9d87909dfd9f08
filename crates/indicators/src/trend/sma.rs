use ta::indicators::SimpleMovingAverage;
use ta::Next;

use crate::error::{check_period, IndicatorError};

/// 简单移动平均，窗口未满时输出 `None`
#[derive(Debug, Clone)]
pub struct SmaIndicator {
    period: usize,
    seen: usize,
    sma: SimpleMovingAverage,
    current: Option<f64>,
}

impl SmaIndicator {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        Ok(Self {
            period,
            seen: 0,
            sma: SimpleMovingAverage::new(period)
                .map_err(|_| IndicatorError::InvalidPeriod(period))?,
            current: None,
        })
    }

    pub fn next(&mut self, value: f64) -> Option<f64> {
        let avg = self.sma.next(value);
        self.seen += 1;
        if self.seen >= self.period {
            self.current = Some(avg);
        }
        self.current
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_sma_window() {
        let mut sma = SmaIndicator::new(3).unwrap();
        assert_eq!(sma.next(1.0), None);
        assert_eq!(sma.next(2.0), None);
        assert!(approx_eq!(f64, sma.next(3.0).unwrap(), 2.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, sma.next(7.0).unwrap(), 4.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, sma.value().unwrap(), 4.0, epsilon = 1e-12));
    }

    #[test]
    fn test_zero_period_rejected() {
        assert_eq!(SmaIndicator::new(0).unwrap_err(), IndicatorError::InvalidPeriod(0));
    }
}
