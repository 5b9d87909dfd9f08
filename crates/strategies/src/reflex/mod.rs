//! Reflex：合并两个估计器的结论
//!
//! - 方向一致：取平均置信度，达到审批下限且审批通过为 HIGH（置信度 ×1.10，最高 0.99），否则 MEDIUM
//! - 方向不一致：LOW，跟随置信度更高的一方（相等时跟随 Quant），置信度 = max(胜者 × 0.8, 0.55)

mod approval;
mod reasons;

pub use approval::{
    ApprovalDecision, ApprovalGate, ApprovalRequest, ApprovalSource, ModelApprovalGate,
    RuleApprovalGate,
};
pub use reasons::build_reasons;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sniper_common::{Direction, SignalQuality, Symbol, Timeframe};
use sniper_core::config::env_f64;

use crate::estimator::EstimatorResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusConfig {
    pub approval_min_confidence: f64,
    pub fallback_approval_confidence: f64,
    pub disagreement_floor: f64,
    pub disagreement_discount: f64,
    pub high_quality_boost: f64,
    pub max_confidence: f64,
    /// 0-100，低于该值的信号直接丢弃
    pub min_confidence_floor: f64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            approval_min_confidence: 0.70,
            fallback_approval_confidence: 0.75,
            disagreement_floor: 0.55,
            disagreement_discount: 0.8,
            high_quality_boost: 1.10,
            max_confidence: 0.99,
            min_confidence_floor: 55.0,
        }
    }
}

impl ConsensusConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            approval_min_confidence: env_f64("APPROVAL_MIN_CONFIDENCE", d.approval_min_confidence),
            fallback_approval_confidence: env_f64(
                "FALLBACK_APPROVAL_CONFIDENCE",
                d.fallback_approval_confidence,
            ),
            disagreement_floor: env_f64("DISAGREEMENT_FLOOR", d.disagreement_floor),
            disagreement_discount: env_f64("DISAGREEMENT_DISCOUNT", d.disagreement_discount),
            high_quality_boost: d.high_quality_boost,
            max_confidence: d.max_confidence,
            min_confidence_floor: env_f64("MIN_CONFIDENCE_FLOOR", d.min_confidence_floor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consensus {
    Agree,
    Disagree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    pub direction: Direction,
    /// 0.0-1.0
    pub confidence: f64,
    pub quality: SignalQuality,
    pub consensus: Consensus,
    /// 两个估计器置信度的平均值
    pub combined: f64,
    pub approval: Option<ApprovalDecision>,
}

impl ConsensusOutcome {
    /// 对外统一使用的 0-100 置信度，保留一位小数
    pub fn confidence_pct(&self) -> f64 {
        (self.confidence * 1000.0).round() / 10.0
    }
}

pub struct ConsensusResolver {
    config: ConsensusConfig,
    gate: Arc<dyn ApprovalGate>,
}

impl ConsensusResolver {
    pub fn new(config: ConsensusConfig, gate: Arc<dyn ApprovalGate>) -> Self {
        Self { config, gate }
    }

    /// 只用规则审批
    pub fn with_rule_gate(config: ConsensusConfig) -> Self {
        let gate = Arc::new(RuleApprovalGate::new(config.fallback_approval_confidence));
        Self::new(config, gate)
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub async fn resolve(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        quant: &EstimatorResult,
        analyst: &EstimatorResult,
    ) -> ConsensusOutcome {
        let cfg = &self.config;
        let combined = (quant.confidence + analyst.confidence) / 2.0;

        if quant.direction != analyst.direction {
            let winner = if analyst.confidence > quant.confidence {
                analyst
            } else {
                quant
            };
            let confidence = (winner.confidence * cfg.disagreement_discount)
                .max(cfg.disagreement_floor)
                .min(cfg.max_confidence);
            debug!(
                "{} {} 估计器分歧 quant={} analyst={}，跟随 {}",
                symbol, timeframe, quant.direction, analyst.direction, winner.direction
            );
            return ConsensusOutcome {
                direction: winner.direction,
                confidence,
                quality: SignalQuality::Low,
                consensus: Consensus::Disagree,
                combined,
                approval: None,
            };
        }

        let mut outcome = ConsensusOutcome {
            direction: quant.direction,
            confidence: combined,
            quality: SignalQuality::Medium,
            consensus: Consensus::Agree,
            combined,
            approval: None,
        };
        if combined >= cfg.approval_min_confidence {
            let request = ApprovalRequest {
                symbol,
                timeframe,
                quant,
                analyst,
                combined,
            };
            let decision = self.gate.review(&request).await;
            info!(
                "{} {} 审批 gate={} approved={} reason={}",
                symbol,
                timeframe,
                self.gate.name(),
                decision.approved,
                decision.reason
            );
            if decision.approved {
                outcome.quality = SignalQuality::High;
                outcome.confidence = (combined * cfg.high_quality_boost).min(cfg.max_confidence);
            }
            outcome.approval = Some(decision);
        }
        outcome
    }
}
