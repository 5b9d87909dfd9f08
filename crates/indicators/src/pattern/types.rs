use serde::{Deserialize, Serialize};

use sniper_common::{Strength, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Bullish,
    Bearish,
    Neutral,
    /// 与最近的短期走势方向相反
    Reversal,
}

/// 识别出的K线形态，每个周期重新计算，不持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub pattern_type: PatternType,
    pub strength: Strength,
    pub timeframe: Timeframe,
    /// 0-100
    pub reliability: u8,
}

impl Pattern {
    pub fn is_strong(&self) -> bool {
        self.strength >= Strength::Strong
    }
}
