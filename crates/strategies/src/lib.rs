//! # OTC Sniper Strategies
//!
//! 方向估计与共识：规则打分（Quant）、大模型分析（Analyst）、一致性审批（Reflex）、汇合度报告、多周期一致性

pub mod analyst;
pub mod confluence;
pub mod estimator;
pub mod quant;
pub mod reflex;
pub mod timeframes;

pub use analyst::{technical_fallback, AnalystEstimator};
pub use confluence::{ConfluenceBias, ConfluenceReport};
pub use estimator::{AnalysisInput, EstimatorResult, EstimatorSource, RuleHit, RuleKind};
pub use quant::QuantEstimator;
pub use reflex::{
    build_reasons, ApprovalDecision, ApprovalGate, ApprovalRequest, ApprovalSource, Consensus,
    ConsensusConfig, ConsensusOutcome, ConsensusResolver, ModelApprovalGate, RuleApprovalGate,
};
pub use timeframes::{EntryTiming, EntryUrgency, TimeframeAgreement, TimeframeTrend};
