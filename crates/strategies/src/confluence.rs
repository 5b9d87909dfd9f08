//! 信号汇合度：RSI、EMA、MACD 与形态的多空计数

use serde::{Deserialize, Serialize};

use sniper_common::Strength;
use sniper_indicators::{IndicatorSnapshot, Pattern, PatternType};

const MAX_FACTORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfluenceBias {
    Bullish,
    Bearish,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceReport {
    /// max(多, 空) / 总数 × 100，一位小数
    pub score: f64,
    pub bullish: u32,
    pub bearish: u32,
    pub direction: ConfluenceBias,
    pub factors: Vec<String>,
}

impl ConfluenceReport {
    pub fn analyze(snapshot: &IndicatorSnapshot, patterns: &[Pattern]) -> Self {
        let mut bullish = 0u32;
        let mut bearish = 0u32;
        let mut factors = Vec::new();

        match snapshot.rsi {
            Some(rsi) if rsi < 30.0 => {
                bullish += 2;
                factors.push("RSI oversold".to_string());
            }
            Some(rsi) if rsi > 70.0 => {
                bearish += 2;
                factors.push("RSI overbought".to_string());
            }
            _ => {}
        }

        if let (Some(fast), Some(slow)) = (snapshot.ema_fast, snapshot.ema_slow) {
            if fast > slow {
                bullish += 1;
                factors.push("EMA bullish".to_string());
            } else if fast < slow {
                bearish += 1;
                factors.push("EMA bearish".to_string());
            }
        }

        if let Some(macd) = snapshot.macd {
            if macd.macd > 0.0 {
                bullish += 1;
                factors.push("MACD positive".to_string());
            } else if macd.macd < 0.0 {
                bearish += 1;
                factors.push("MACD negative".to_string());
            }
        }

        for pattern in patterns {
            let weight = if pattern.strength >= Strength::Strong { 2 } else { 1 };
            match pattern.pattern_type {
                PatternType::Bullish => {
                    bullish += weight;
                    factors.push(format!("{} pattern", pattern.name));
                }
                PatternType::Bearish => {
                    bearish += weight;
                    factors.push(format!("{} pattern", pattern.name));
                }
                PatternType::Neutral | PatternType::Reversal => {}
            }
        }

        let total = bullish + bearish;
        let score = bullish.max(bearish) as f64 / total.max(1) as f64 * 100.0;
        let direction = if bullish > bearish {
            ConfluenceBias::Bullish
        } else if bearish > bullish {
            ConfluenceBias::Bearish
        } else {
            ConfluenceBias::Mixed
        };
        factors.truncate(MAX_FACTORS);

        Self {
            score: (score * 10.0).round() / 10.0,
            bullish,
            bearish,
            direction,
            factors,
        }
    }
}
