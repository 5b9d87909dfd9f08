//! Analyst 估计器：询问大模型，失败时退回确定性的三指标投票

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use sniper_ai_analysis::{
    build_analysis_prompt, parse_analyst_reply, CompletionRequest, LanguageModel,
    ANALYST_SYSTEM_PROMPT,
};
use sniper_common::Direction;
use sniper_indicators::IndicatorSnapshot;

use crate::estimator::{AnalysisInput, EstimatorResult, EstimatorSource};

pub const MODEL_MIN_CONFIDENCE: f64 = 0.65;
pub const MODEL_MAX_CONFIDENCE: f64 = 0.95;
pub const FALLBACK_MIN_CONFIDENCE: f64 = 0.55;
pub const FALLBACK_MAX_CONFIDENCE: f64 = 0.75;

pub struct AnalystEstimator {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl AnalystEstimator {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// 永不失败：模型的任何问题都转为规则回退并标记降级
    pub async fn estimate(&self, input: &AnalysisInput) -> EstimatorResult {
        let prompt = build_analysis_prompt(
            &input.symbol,
            input.timeframe,
            &input.snapshot,
            &input.patterns,
        );
        let request = CompletionRequest::new(ANALYST_SYSTEM_PROMPT, prompt);

        let reply = match tokio::time::timeout(self.timeout, self.model.complete(&request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Analyst 模型调用失败 {} {}: {}", input.symbol, input.timeframe, e);
                return technical_fallback(input, &format!("model error: {}", e));
            }
            Err(_) => {
                warn!(
                    "Analyst 模型超时 {} {} ({}ms)",
                    input.symbol,
                    input.timeframe,
                    self.timeout.as_millis()
                );
                return technical_fallback(
                    input,
                    &format!("timeout after {}ms", self.timeout.as_millis()),
                );
            }
        };

        match parse_analyst_reply(&reply) {
            Ok(parsed) => {
                debug!(
                    "Analyst {} {} -> {} {:.2}",
                    input.symbol, input.timeframe, parsed.direction, parsed.confidence
                );
                EstimatorResult {
                    direction: parsed.direction,
                    confidence: parsed
                        .confidence
                        .clamp(MODEL_MIN_CONFIDENCE, MODEL_MAX_CONFIDENCE),
                    explanation: parsed.explanation,
                    source: EstimatorSource::Analyst {
                        model: self.model.name().to_string(),
                    },
                }
            }
            Err(e) => {
                warn!("Analyst 回复无法解析 {} {}: {}", input.symbol, input.timeframe, e);
                technical_fallback(input, &format!("unparseable reply: {}", e))
            }
        }
    }
}

/// 三指标投票：RSI < 50、MACD 高于信号线、收盘价高于 EMA20 各投一票上涨，反之投下跌
fn votes(snapshot: &IndicatorSnapshot) -> Vec<Direction> {
    let mut votes = Vec::with_capacity(3);
    if let Some(rsi) = snapshot.rsi {
        votes.push(if rsi < 50.0 { Direction::Up } else { Direction::Down });
    }
    if let Some(macd) = snapshot.macd {
        if let Some(signal) = macd.signal {
            if macd.macd > signal {
                votes.push(Direction::Up);
            } else if macd.macd < signal {
                votes.push(Direction::Down);
            }
        }
    }
    if let (Some(close), Some(ema)) = (snapshot.last_close, snapshot.ema_anchor) {
        if close > ema {
            votes.push(Direction::Up);
        } else if close < ema {
            votes.push(Direction::Down);
        }
    }
    votes
}

/// 模型不可用时的确定性结果，置信度 `0.5 + 0.25 * (同意 - 反对) / 3`，夹到 [0.55, 0.75]
pub fn technical_fallback(input: &AnalysisInput, reason: &str) -> EstimatorResult {
    let votes = votes(&input.snapshot);
    let up = votes.iter().filter(|d| **d == Direction::Up).count() as f64;
    let down = votes.len() as f64 - up;
    let direction = if up > down {
        Direction::Up
    } else if down > up {
        Direction::Down
    } else {
        input.short_term_move().unwrap_or(Direction::Up)
    };
    let (agree, disagree) = match direction {
        Direction::Up => (up, down),
        Direction::Down => (down, up),
    };
    let confidence = (0.5 + 0.25 * (agree - disagree) / 3.0)
        .clamp(FALLBACK_MIN_CONFIDENCE, FALLBACK_MAX_CONFIDENCE);

    EstimatorResult {
        direction,
        confidence,
        explanation: format!(
            "[fallback] technical vote {} of {} for {}",
            agree,
            votes.len(),
            direction
        ),
        source: EstimatorSource::AnalystFallback {
            reason: reason.to_string(),
        },
    }
}
