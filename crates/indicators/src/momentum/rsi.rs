use crate::error::{check_period, IndicatorError};

/// Wilder 平滑（RMA）：前 `length` 个值取简单平均作种子，之后 `avg = (avg * (n - 1) + x) / n`
#[derive(Debug, Clone)]
struct WilderRma {
    length: usize,
    count: usize,
    seed_sum: f64,
    avg: Option<f64>,
}

impl WilderRma {
    fn new(length: usize) -> Self {
        Self {
            length,
            count: 0,
            seed_sum: 0.0,
            avg: None,
        }
    }

    fn next(&mut self, value: f64) -> Option<f64> {
        match self.avg {
            Some(prev) => {
                let n = self.length as f64;
                self.avg = Some((prev * (n - 1.0) + value) / n);
            }
            None => {
                self.count += 1;
                self.seed_sum += value;
                if self.count == self.length {
                    self.avg = Some(self.seed_sum / self.length as f64);
                }
            }
        }
        self.avg
    }
}

/// RSI（Wilder）
///
/// 需要 `period + 1` 个收盘价才有输出：
/// `down == 0 ? 100 : up == 0 ? 0 : 100 - 100 / (1 + up / down)`
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    period: usize,
    up_rma: WilderRma,
    down_rma: WilderRma,
    prev_value: Option<f64>,
    current: Option<f64>,
}

impl RsiIndicator {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        Ok(Self {
            period,
            up_rma: WilderRma::new(period),
            down_rma: WilderRma::new(period),
            prev_value: None,
            current: None,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn next(&mut self, value: f64) -> Option<f64> {
        let prev = match self.prev_value.replace(value) {
            Some(prev) => prev,
            None => return None,
        };
        let change = value - prev;
        let up = change.max(0.0);
        let down = (-change).max(0.0);

        let up_avg = self.up_rma.next(up);
        let down_avg = self.down_rma.next(down);

        self.current = match (up_avg, down_avg) {
            (Some(up_avg), Some(down_avg)) => Some(Self::rsi_from_averages(up_avg, down_avg)),
            _ => None,
        };
        self.current
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }

    fn rsi_from_averages(up_avg: f64, down_avg: f64) -> f64 {
        if down_avg <= 0.0 {
            100.0
        } else if up_avg <= 0.0 {
            0.0
        } else {
            let rsi = 100.0 - 100.0 / (1.0 + up_avg / down_avg);
            rsi.clamp(0.0, 100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    // Wilder 原书示例数据
    const PRICES: [f64; 20] = [
        44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
        45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
    ];

    #[test]
    fn test_rsi_needs_period_plus_one_values() {
        let mut rsi = RsiIndicator::new(14).unwrap();
        for price in PRICES.iter().take(14) {
            assert_eq!(rsi.next(*price), None);
        }
        let first = rsi.next(PRICES[14]).unwrap();
        assert!(approx_eq!(f64, first, 70.46, epsilon = 0.05));
    }

    #[test]
    fn test_rsi_wilder_smoothing() {
        let mut rsi = RsiIndicator::new(14).unwrap();
        let mut last = None;
        for price in PRICES.iter().take(16) {
            last = rsi.next(*price);
        }
        // 第 16 个收盘价 46.00 对应 RSI ≈ 66.25
        assert!(approx_eq!(f64, last.unwrap(), 66.25, epsilon = 0.05));
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let mut rsi = RsiIndicator::new(5).unwrap();
        let mut out = None;
        for i in 0..10 {
            out = rsi.next(1.0 + i as f64 * 0.01);
        }
        assert_eq!(out, Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_0() {
        let mut rsi = RsiIndicator::new(5).unwrap();
        let mut out = None;
        for i in 0..10 {
            out = rsi.next(10.0 - i as f64 * 0.1);
        }
        assert_eq!(out, Some(0.0));
    }

    #[test]
    fn test_rsi_flat_series_is_100() {
        let mut rsi = RsiIndicator::new(3).unwrap();
        let mut out = None;
        for _ in 0..6 {
            out = rsi.next(1.2345);
        }
        assert_eq!(out, Some(100.0));
    }
}
