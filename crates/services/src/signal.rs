use serde::{Deserialize, Serialize};

use sniper_common::{Direction, SignalQuality, Strength, Symbol, Timeframe};
use sniper_risk::{BlockReason, PositionRecommendation, RiskAssessment};
use sniper_strategies::{Consensus, ConfluenceReport, EntryTiming, TimeframeAgreement};

/// 对外发出的交易信号，发出后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub direction: Direction,
    /// 0-100，一位小数
    pub confidence: f64,
    pub quality: SignalQuality,
    pub strength: Strength,
    pub consensus: Consensus,
    pub reasons: Vec<String>,
    pub risk_assessment: RiskAssessment,
    pub position: PositionRecommendation,
    pub confluence: ConfluenceReport,
    pub timeframe_agreement: TimeframeAgreement,
    pub entry_timing: EntryTiming,
    pub analyst_degraded: bool,
    pub data_stale: bool,
    pub data_source: String,
    /// 计算时间
    pub timestamp: i64,
    pub expiry: i64,
}

impl Signal {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expiry
    }
}

/// 信号被拦下的原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WithheldReason {
    BelowConfidenceFloor { confidence: f64, floor: f64 },
    EmergencyStop { reason: Option<String> },
    Discipline { reason: BlockReason, pause_started: bool },
}

impl std::fmt::Display for WithheldReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithheldReason::BelowConfidenceFloor { confidence, floor } => {
                write!(f, "confidence {:.1} below floor {:.1}", confidence, floor)
            }
            WithheldReason::EmergencyStop { reason } => write!(
                f,
                "emergency stop active: {}",
                reason.as_deref().unwrap_or("manual")
            ),
            WithheldReason::Discipline { reason, .. } => write!(f, "discipline: {}", reason),
        }
    }
}

/// 一次流水线调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    Emitted(Signal),
    /// 缓存期内的重复请求，返回同一个信号
    Cached(Signal),
    Withheld(WithheldReason),
    NoData,
}

impl SignalOutcome {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            SignalOutcome::Emitted(s) | SignalOutcome::Cached(s) => Some(s),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalOutcome::Emitted(_) => "emitted",
            SignalOutcome::Cached(_) => "cached",
            SignalOutcome::Withheld(_) => "withheld",
            SignalOutcome::NoData => "no_data",
        }
    }
}
