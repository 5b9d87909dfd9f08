//! 大模型抽象
//!
//! 上层只通过 [`LanguageModel::complete`] “问模型一句话”，不依赖任何具体 SDK。

mod openai;

pub use openai::OpenAiChatClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sniper_core::config::{env_i64, env_is_true, env_opt, env_or_default};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model not configured: {0}")]
    NotConfigured(String),

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("empty completion")]
    EmptyResponse,

    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: 400,
            temperature: 0.2,
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 模型标识，写入信号来源
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// 未配置 API Key 时使用，所有调用直接失败，上层走规则回退
#[derive(Debug, Clone, Default)]
pub struct UnavailableModel;

#[async_trait]
impl LanguageModel for UnavailableModel {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured("LLM_API_KEY not set".to_string()))
    }
}

/// 大模型配置
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_ms: u64,
    /// 是否让模型参与一致性审批
    pub enable_approval: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 15_000,
            enable_approval: true,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_key: env_opt("LLM_API_KEY"),
            base_url: env_or_default("LLM_BASE_URL", &d.base_url),
            model: env_or_default("LLM_MODEL", &d.model),
            timeout_ms: env_i64("ANALYST_TIMEOUT_MS", d.timeout_ms as i64).max(1) as u64,
            enable_approval: env_is_true("ENABLE_LLM_APPROVAL", d.enable_approval),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_model_always_fails() {
        let model = UnavailableModel;
        let err = model
            .complete(&CompletionRequest::new("sys", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }

    #[test]
    fn test_default_config_is_unconfigured() {
        let config = LlmConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout_ms, 15_000);
    }
}
