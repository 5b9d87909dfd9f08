//! 一致性审批门
//!
//! 模型审批失败或回复无法解析时由规则审批兜底。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use sniper_ai_analysis::{
    build_approval_prompt, parse_approval_reply, ApprovalContext, CompletionRequest,
    LanguageModel, REFLEX_SYSTEM_PROMPT,
};
use sniper_common::{Direction, Symbol, Timeframe};

use crate::estimator::EstimatorResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalSource {
    Model,
    Rule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub reason: String,
    pub source: ApprovalSource,
}

/// 审批请求
#[derive(Debug, Clone)]
pub struct ApprovalRequest<'a> {
    pub symbol: &'a Symbol,
    pub timeframe: Timeframe,
    pub quant: &'a EstimatorResult,
    pub analyst: &'a EstimatorResult,
    /// 两个置信度的平均值
    pub combined: f64,
}

impl ApprovalRequest<'_> {
    pub fn agree(&self) -> bool {
        self.quant.direction == self.analyst.direction
    }
}

#[async_trait]
pub trait ApprovalGate: Send + Sync {
    fn name(&self) -> &'static str;

    async fn review(&self, request: &ApprovalRequest<'_>) -> ApprovalDecision;
}

/// 规则审批：方向一致且平均置信度达到阈值
#[derive(Debug, Clone)]
pub struct RuleApprovalGate {
    threshold: f64,
}

impl RuleApprovalGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn decide(&self, request: &ApprovalRequest<'_>) -> ApprovalDecision {
        let approved = request.agree() && request.combined >= self.threshold;
        let reason = if !request.agree() {
            "estimators disagree".to_string()
        } else if approved {
            format!("combined {:.2} >= {:.2}", request.combined, self.threshold)
        } else {
            format!("combined {:.2} < {:.2}", request.combined, self.threshold)
        };
        ApprovalDecision {
            approved,
            reason,
            source: ApprovalSource::Rule,
        }
    }
}

#[async_trait]
impl ApprovalGate for RuleApprovalGate {
    fn name(&self) -> &'static str {
        "rule"
    }

    async fn review(&self, request: &ApprovalRequest<'_>) -> ApprovalDecision {
        self.decide(request)
    }
}

/// 模型审批，失败时退回规则审批
pub struct ModelApprovalGate {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
    fallback: RuleApprovalGate,
}

impl ModelApprovalGate {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration, fallback: RuleApprovalGate) -> Self {
        Self {
            model,
            timeout,
            fallback,
        }
    }
}

#[async_trait]
impl ApprovalGate for ModelApprovalGate {
    fn name(&self) -> &'static str {
        "model"
    }

    async fn review(&self, request: &ApprovalRequest<'_>) -> ApprovalDecision {
        let quant_summary = request.quant.summary();
        let analyst_summary = request.analyst.summary();
        let direction: Direction = request.quant.direction;
        let prompt = build_approval_prompt(&ApprovalContext {
            symbol: request.symbol,
            timeframe: request.timeframe,
            direction,
            combined_confidence: request.combined,
            quant_summary: &quant_summary,
            analyst_summary: &analyst_summary,
        });
        let completion = CompletionRequest::new(REFLEX_SYSTEM_PROMPT, prompt);

        let reply = match tokio::time::timeout(self.timeout, self.model.complete(&completion)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("审批模型调用失败，使用规则审批: {}", e);
                return self.fallback.decide(request);
            }
            Err(_) => {
                warn!("审批模型超时，使用规则审批");
                return self.fallback.decide(request);
            }
        };
        match parse_approval_reply(&reply) {
            Ok(parsed) => ApprovalDecision {
                approved: parsed.approved,
                reason: parsed.reason,
                source: ApprovalSource::Model,
            },
            Err(e) => {
                warn!("审批回复无法解析，使用规则审批: {}", e);
                self.fallback.decide(request)
            }
        }
    }
}
