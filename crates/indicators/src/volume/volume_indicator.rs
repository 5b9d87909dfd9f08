use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{check_period, IndicatorError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeStats {
    pub current: f64,
    /// 前 N 根K线的平均成交量
    pub average: f64,
    /// 平均成交量为 0 时不可用（OTC 数据源通常没有成交量）
    pub ratio: Option<f64>,
}

/// 成交量比率指标
/// 计算当前成交量与前n根K线平均成交量的比值
#[derive(Debug, Clone)]
pub struct VolumeRatioIndicator {
    // 前N根K线的成交量
    prev_volumes: VecDeque<f64>,
    volume_bar_num: usize,
}

impl VolumeRatioIndicator {
    pub fn new(length: usize) -> Result<Self, IndicatorError> {
        let length = check_period(length)?;
        Ok(Self {
            prev_volumes: VecDeque::with_capacity(length + 1),
            volume_bar_num: length,
        })
    }

    /// 第一根K线没有历史，返回 None
    pub fn next(&mut self, current_volume: f64) -> Option<VolumeStats> {
        let stats = if self.prev_volumes.is_empty() {
            None
        } else {
            let average = self.avg_volume();
            let ratio = if average > 0.0 {
                Some(current_volume / average)
            } else {
                None
            };
            Some(VolumeStats {
                current: current_volume,
                average,
                ratio,
            })
        };

        self.prev_volumes.push_back(current_volume);
        //只保留前N根K线的成交量
        if self.prev_volumes.len() > self.volume_bar_num {
            self.prev_volumes.pop_front();
        }
        stats
    }

    pub fn avg_volume(&self) -> f64 {
        if self.prev_volumes.is_empty() {
            return 0.0;
        }
        self.prev_volumes.iter().sum::<f64>() / self.prev_volumes.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_ratio_indicator() {
        let mut indicator = VolumeRatioIndicator::new(3).unwrap();
        assert!(indicator.next(100.0).is_none());
        indicator.next(200.0);
        indicator.next(300.0);
        assert_eq!(indicator.avg_volume(), 200.0);
        let stats = indicator.next(400.0).unwrap();
        assert_eq!(stats.average, 200.0);
        assert_eq!(stats.ratio, Some(2.0));
    }

    #[test]
    fn test_zero_volume_has_no_ratio() {
        let mut indicator = VolumeRatioIndicator::new(3).unwrap();
        indicator.next(0.0);
        let stats = indicator.next(0.0).unwrap();
        assert_eq!(stats.ratio, None);
    }
}
