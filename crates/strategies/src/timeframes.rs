//! 多周期一致性与入场时机

use serde::{Deserialize, Serialize};

use sniper_common::{Direction, Strength, Timeframe};
use sniper_indicators::{Pattern, TrendBias};

use crate::confluence::ConfluenceBias;

/// 至少这么多个有方向的周期才算多周期共振
const MIN_ALIGNED_TIMEFRAMES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeTrend {
    pub timeframe: Timeframe,
    pub trend: TrendBias,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAgreement {
    /// 多数方向占有方向周期的百分比，一位小数；多空持平为 0
    pub agreement: f64,
    pub direction: ConfluenceBias,
    /// >75 Strong，>50 Medium，其余 Weak
    pub strength: Strength,
    /// 只记录有方向的周期，中性周期不参与统计
    pub timeframes: Vec<TimeframeTrend>,
}

impl TimeframeAgreement {
    pub fn analyze(trends: &[TimeframeTrend]) -> Self {
        let timeframes: Vec<TimeframeTrend> = trends
            .iter()
            .filter(|t| t.trend != TrendBias::Neutral)
            .copied()
            .collect();

        let bullish = timeframes
            .iter()
            .filter(|t| t.trend == TrendBias::Bullish)
            .count();
        let bearish = timeframes.len() - bullish;
        let total = timeframes.len().max(1) as f64;

        let (agreement, direction) = if bullish > bearish {
            (bullish as f64 / total * 100.0, ConfluenceBias::Bullish)
        } else if bearish > bullish {
            (bearish as f64 / total * 100.0, ConfluenceBias::Bearish)
        } else {
            (0.0, ConfluenceBias::Mixed)
        };

        let strength = if agreement > 75.0 {
            Strength::Strong
        } else if agreement > 50.0 {
            Strength::Medium
        } else {
            Strength::Weak
        };

        Self {
            agreement: (agreement * 10.0).round() / 10.0,
            direction,
            strength,
            timeframes,
        }
    }

    /// 多个周期强一致地指向 `direction`
    pub fn confirms(&self, direction: Direction) -> bool {
        let aligned = match self.direction {
            ConfluenceBias::Bullish => direction == Direction::Up,
            ConfluenceBias::Bearish => direction == Direction::Down,
            ConfluenceBias::Mixed => false,
        };
        aligned
            && self.strength >= Strength::Strong
            && self.timeframes.len() >= MIN_ALIGNED_TIMEFRAMES
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryUrgency {
    High,
    Medium,
}

/// 入场时机：在信号周期的下一根K线开盘时入场
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryTiming {
    pub timeframe: Timeframe,
    /// 下一根K线的开盘时间（毫秒）
    pub enter_at: i64,
    pub recommendation: String,
    /// 出现形态时为 High
    pub urgency: EntryUrgency,
}

impl EntryTiming {
    pub fn plan(timeframe: Timeframe, now_ms: i64, patterns: &[Pattern]) -> Self {
        let duration = timeframe.duration_ms();
        let enter_at = (now_ms.div_euclid(duration) + 1) * duration;
        let urgency = if patterns.is_empty() {
            EntryUrgency::Medium
        } else {
            EntryUrgency::High
        };
        Self {
            timeframe,
            enter_at,
            recommendation: format!("Enter on next {} candle", timeframe),
            urgency,
        }
    }
}
