use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::trend::EmaIndicator;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub macd: f64,
    /// 信号线在 `slow + signal - 1` 个收盘价之前不可用
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// MACD = EMA(fast) - EMA(slow)，信号线为 MACD 序列的 EMA(signal)
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    fast: EmaIndicator,
    slow: EmaIndicator,
    signal: EmaIndicator,
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, IndicatorError> {
        if fast >= slow {
            return Err(IndicatorError::InvalidMacdPeriods { fast, slow });
        }
        Ok(Self {
            fast: EmaIndicator::new(fast)?,
            slow: EmaIndicator::new(slow)?,
            signal: EmaIndicator::new(signal)?,
        })
    }

    pub fn next(&mut self, close: f64) -> Option<MacdOutput> {
        let fast = self.fast.next(close);
        let slow = self.slow.next(close);
        let (fast, slow) = match (fast, slow) {
            (Some(f), Some(s)) => (f, s),
            _ => return None,
        };
        let macd = fast - slow;
        let signal = self.signal.next(macd);
        Some(MacdOutput {
            macd,
            signal,
            histogram: signal.map(|s| macd - s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_macd_availability() {
        let mut macd = MacdIndicator::new(3, 5, 2).unwrap();
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let outputs: Vec<_> = closes.iter().map(|c| macd.next(*c)).collect();
        assert!(outputs[..4].iter().all(|o| o.is_none()));
        // 第 5 个收盘价：MACD 可用，信号线未满
        let fifth = outputs[4].unwrap();
        assert!(fifth.signal.is_none());
        // 第 6 个收盘价 = slow + signal - 1
        let sixth = outputs[5].unwrap();
        assert!(sixth.signal.is_some());
        assert!(approx_eq!(
            f64,
            sixth.histogram.unwrap(),
            sixth.macd - sixth.signal.unwrap(),
            epsilon = 1e-12
        ));
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let mut macd = MacdIndicator::new(12, 26, 9).unwrap();
        let mut last = None;
        for i in 0..60 {
            last = macd.next(1.0 + i as f64 * 0.001);
        }
        let out = last.unwrap();
        assert!(out.macd > 0.0);
        assert!(out.signal.is_some());
    }

    #[test]
    fn test_invalid_periods() {
        assert!(MacdIndicator::new(26, 12, 9).is_err());
        assert!(MacdIndicator::new(0, 12, 9).is_err());
    }
}
