//! # OTC Sniper Risk
//!
//! 风控治理：交易纪律、仓位建议、风险评估、交易账本与紧急停止

pub mod assessment;
pub mod discipline;
pub mod ledger;
pub mod sizing;

pub use assessment::{AssessmentInput, RiskAssessment};
pub use discipline::{
    BlockReason, DisciplineConfig, DisciplineDecision, DisciplineEngine, DisciplineState,
};
pub use ledger::{
    EmergencyStop, EmergencyStopEvent, LedgerConfig, LedgerSnapshot, LedgerStats, TradeLedger,
    TradeOutcome, TradeRecord,
};
pub use sizing::{PositionRecommendation, RiskConfig, RiskManager, RiskState};
