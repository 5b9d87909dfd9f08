use serde::{Deserialize, Serialize};

use sniper_common::{RiskLevel, VolatilityLevel};

/// 风险评估的输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentInput {
    pub confidence_pct: f64,
    pub volatility: VolatilityLevel,
    pub data_stale: bool,
    pub analyst_degraded: bool,
    pub loss_streak: u32,
}

/// 单个信号的风险评分，0-100，越高越危险
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

impl RiskAssessment {
    pub fn assess(input: &AssessmentInput) -> Self {
        let mut score: i32 = 50;
        let mut factors = Vec::new();

        if input.confidence_pct > 80.0 {
            score -= 15;
            factors.push("high confidence".to_string());
        } else if input.confidence_pct < 65.0 {
            score += 15;
            factors.push("low confidence".to_string());
        }

        match input.volatility {
            VolatilityLevel::High => {
                score += 20;
                factors.push("high volatility".to_string());
            }
            VolatilityLevel::Low => {
                score += 10;
                factors.push("low volatility".to_string());
            }
            VolatilityLevel::Normal => {}
        }

        if input.data_stale {
            score += 10;
            factors.push("stale market data".to_string());
        }
        if input.analyst_degraded {
            score += 5;
            factors.push("analyst fallback".to_string());
        }
        if input.loss_streak >= 2 {
            score += 10;
            factors.push(format!("{} consecutive losses", input.loss_streak));
        }

        let score = score.clamp(0, 100) as u8;
        let level = if score > 70 {
            RiskLevel::High
        } else if score > 40 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Self {
            score,
            level,
            factors,
        }
    }
}
