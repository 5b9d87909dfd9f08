use std::collections::VecDeque;
use std::fmt;

use crate::error::{check_period, IndicatorError};

/// 平均真实波幅：真实波幅的 `period` 简单平均
///
/// 真实波幅需要前一根收盘价，因此需要 `period + 1` 根 K 线才有输出。
#[derive(Debug, Clone)]
pub struct ATR {
    period: usize,
    prev_close: Option<f64>,
    buffer: VecDeque<f64>,
}

impl ATR {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        Ok(Self {
            period,
            prev_close: None,
            buffer: VecDeque::with_capacity(period + 1),
        })
    }

    pub fn reset(&mut self) {
        self.prev_close = None;
        self.buffer.clear();
    }

    /// 只需传入最新K线的高低收盘价，指标内部会维护所需的历史数据
    pub fn next(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        if let Some(prev_close) = self.prev_close {
            let tr = (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs());
            self.buffer.push_back(tr);
            if self.buffer.len() > self.period {
                self.buffer.pop_front();
            }
        }
        self.prev_close = Some(close);
        self.value()
    }

    /// 当前ATR值，数据不足返回None（类似PineScript的na）
    pub fn value(&self) -> Option<f64> {
        if self.is_ready() {
            Some(self.buffer.iter().sum::<f64>() / self.period as f64)
        } else {
            None
        }
    }

    /// 检查是否有足够的数据来计算有效的ATR值
    pub fn is_ready(&self) -> bool {
        self.buffer.len() >= self.period
    }
}

impl fmt::Display for ATR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "ATR({}): {:.5}", self.period, v),
            None => write!(f, "ATR({}): na", self.period),
        }
    }
}

// 测试用例
#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_initial_phase() {
        let mut atr = ATR::new(3).unwrap();

        // 前3根K线数据不足
        assert_eq!(atr.next(10.0, 8.0, 9.0), None);
        assert_eq!(atr.next(11.0, 9.0, 10.0), None);
        assert_eq!(atr.next(12.0, 10.0, 11.0), None);

        // 第4根K线开始有效
        let val = atr.next(13.0, 11.0, 12.0).unwrap();
        assert!(approx_eq!(f64, val, 2.0, epsilon = 0.001));
    }

    #[test]
    fn test_true_range_uses_gap() {
        let test_data = vec![
            // (high, low, close, expected)
            (10.0, 9.0, 9.5, None),
            (10.0, 9.0, 9.5, None),      // TR = 1
            (12.0, 11.5, 11.8, Some(1.75)), // TR = |12 - 9.5| = 2.5
        ];

        let mut atr = ATR::new(2).unwrap();
        for (idx, (h, l, c, expected)) in test_data.iter().enumerate() {
            let result = atr.next(*h, *l, *c);
            match expected {
                Some(e) => assert!(
                    approx_eq!(f64, result.unwrap(), *e, epsilon = 1e-9),
                    "bar {}",
                    idx + 1
                ),
                None => assert!(result.is_none(), "bar {}", idx + 1),
            }
        }
        assert_eq!(format!("{}", atr), "ATR(2): 1.75000");
    }

    #[test]
    fn test_reset() {
        let mut atr = ATR::new(1).unwrap();
        atr.next(2.0, 1.0, 1.5);
        assert!(atr.next(2.0, 1.0, 1.5).is_some());
        atr.reset();
        assert!(atr.value().is_none());
    }
}
