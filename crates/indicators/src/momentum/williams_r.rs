use ta::indicators::{Maximum, Minimum};
use ta::Next;

use crate::error::{check_period, IndicatorError};

/// Williams %R = -100 * (HH - C) / (HH - LL)，区间无波动时为 -50
#[derive(Debug, Clone)]
pub struct WilliamsRIndicator {
    period: usize,
    seen: usize,
    highest: Maximum,
    lowest: Minimum,
}

impl WilliamsRIndicator {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        Ok(Self {
            period,
            seen: 0,
            highest: Maximum::new(period).map_err(|_| IndicatorError::InvalidPeriod(period))?,
            lowest: Minimum::new(period).map_err(|_| IndicatorError::InvalidPeriod(period))?,
        })
    }

    pub fn next(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let hh = self.highest.next(high);
        let ll = self.lowest.next(low);
        self.seen += 1;
        if self.seen < self.period {
            return None;
        }
        let range = hh - ll;
        if range > 0.0 {
            Some((-100.0 * (hh - close) / range).clamp(-100.0, 0.0))
        } else {
            Some(-50.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_williams_r() {
        let mut wr = WilliamsRIndicator::new(2).unwrap();
        assert!(wr.next(10.0, 8.0, 9.0).is_none());
        let v = wr.next(11.0, 9.0, 8.5).unwrap();
        // HH = 11, LL = 8 => -100 * 2.5 / 3
        assert!(approx_eq!(f64, v, -250.0 / 3.0, epsilon = 1e-9));
    }
}
