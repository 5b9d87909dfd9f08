//! # OTC Sniper AI Analysis
//!
//! 大模型接入：`LanguageModel` 抽象、OpenAI 兼容客户端、提示词与回复解析

pub mod llm;
pub mod prompts;
pub mod response;

pub use llm::{
    CompletionRequest, LanguageModel, LlmConfig, LlmError, OpenAiChatClient, UnavailableModel,
};
pub use prompts::{build_analysis_prompt, build_approval_prompt, ApprovalContext, ANALYST_SYSTEM_PROMPT, REFLEX_SYSTEM_PROMPT};
pub use response::{parse_analyst_reply, parse_approval_reply, AnalystReply, ApprovalReply, ReplyError};
