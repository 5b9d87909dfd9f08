//! 估计器的公共输入输出

use serde::{Deserialize, Serialize};

use sniper_common::{Direction, Symbol, Timeframe};
use sniper_indicators::{IndicatorSnapshot, Pattern};

/// 一次估计的输入，Quant 与 Analyst 共用
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub snapshot: IndicatorSnapshot,
    pub patterns: Vec<Pattern>,
}

impl AnalysisInput {
    /// 最新一根相对前一根的方向，持平或数据不足为 None
    pub fn short_term_move(&self) -> Option<Direction> {
        match self.snapshot.momentum() {
            Some(m) if m > 0.0 => Some(Direction::Up),
            Some(m) if m < 0.0 => Some(Direction::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Rsi,
    EmaCross,
    MacdZero,
    MacdSignal,
    TrendEma,
    Bollinger,
    Stochastic,
    WilliamsR,
    Cci,
    Volume,
    Pattern,
}

/// 单条规则命中记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleHit {
    pub rule: RuleKind,
    /// 支持的方向，Up 计入多头分，Down 计入空头分
    pub side: Direction,
    pub weight: f64,
    pub detail: String,
}

/// 结果来源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSource {
    Quant { breakdown: Vec<RuleHit> },
    Analyst { model: String },
    /// 模型不可用、超时或回复无法解析时的规则投票
    AnalystFallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorResult {
    pub direction: Direction,
    /// 0.0-1.0
    pub confidence: f64,
    pub explanation: String,
    pub source: EstimatorSource,
}

impl EstimatorResult {
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, EstimatorSource::AnalystFallback { .. })
    }

    /// 用于日志与审批提示词的一行摘要
    pub fn summary(&self) -> String {
        format!(
            "{} {:.2} ({})",
            self.direction, self.confidence, self.explanation
        )
    }

    /// 按权重降序的规则命中，仅 Quant 结果有
    pub fn top_hits(&self, n: usize) -> Vec<&RuleHit> {
        match &self.source {
            EstimatorSource::Quant { breakdown } => {
                let mut hits: Vec<&RuleHit> = breakdown.iter().collect();
                hits.sort_by(|a, b| b.weight.total_cmp(&a.weight));
                hits.truncate(n);
                hits
            }
            _ => Vec::new(),
        }
    }
}
