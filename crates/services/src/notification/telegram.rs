use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use sniper_common::utils::time::mill_time_to_local_string;
use sniper_common::{Direction, EnumAsStrTrait};
use sniper_core::config::env_opt;
use sniper_risk::EmergencyStopEvent;

use super::SignalNotifier;
use crate::signal::Signal;

/// Telegram Bot 通知服务
pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// 从环境变量创建通知器
    /// 需要设置: TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env_opt("TELEGRAM_BOT_TOKEN").ok_or_else(|| anyhow::anyhow!("TELEGRAM_BOT_TOKEN not set"))?;
        let chat_id =
            env_opt("TELEGRAM_CHAT_ID").ok_or_else(|| anyhow::anyhow!("TELEGRAM_CHAT_ID not set"))?;
        Ok(Self::new(bot_token, chat_id))
    }

    /// 发送文本消息 (Markdown 格式)
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);

        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if response.status().is_success() {
            info!("📨 Telegram message sent successfully");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Failed to send Telegram message: {} - {}", status, body);
            Err(anyhow::anyhow!("Telegram API error: {}", status))
        }
    }
}

pub(crate) fn format_signal(signal: &Signal) -> String {
    let emoji = match signal.direction {
        Direction::Up => "🟢",
        Direction::Down => "🔴",
    };
    let mut message = format!(
        "{} *{} 信号*\n\n\
         *品种*: `{}`\n\
         *周期*: {}\n\
         *置信度*: {:.1}% ({})\n\
         *质量*: {}\n\
         *建议金额*: {:.2} ({:.2}%)\n\
         *风险*: {} ({})\n\
         *入场*: {}\n\
         *到期*: {}\n",
        emoji,
        signal.direction,
        signal.symbol,
        signal.timeframe.as_str(),
        signal.confidence,
        signal.strength.as_str(),
        signal.quality.as_str(),
        signal.position.amount,
        signal.position.risk_percent,
        signal.risk_assessment.level.as_str(),
        signal.risk_assessment.score,
        mill_time_to_local_string(signal.entry_timing.enter_at),
        mill_time_to_local_string(signal.expiry),
    );
    if !signal.timeframe_agreement.timeframes.is_empty() {
        message.push_str(&format!(
            "*多周期一致*: {:.1}% ({} 个周期)\n",
            signal.timeframe_agreement.agreement,
            signal.timeframe_agreement.timeframes.len()
        ));
    }
    if !signal.reasons.is_empty() {
        message.push_str("\n*理由*:\n");
        for reason in &signal.reasons {
            message.push_str(&format!("• {}\n", reason));
        }
    }
    if signal.analyst_degraded || signal.data_stale {
        message.push_str("\n⚠️ 降级: ");
        let mut flags = Vec::new();
        if signal.analyst_degraded {
            flags.push("analyst fallback");
        }
        if signal.data_stale {
            flags.push("stale data");
        }
        message.push_str(&flags.join(", "));
        message.push('\n');
    }
    message
}

pub(crate) fn format_emergency(event: &EmergencyStopEvent) -> String {
    format!(
        "🛑 *紧急停止*\n\n\
         *原因*: {}\n\
         *连续亏损*: {}\n\
         *时间*: {}\n\n\
         手动复位前不会再发出信号",
        event.reason,
        event.consecutive_losses,
        mill_time_to_local_string(event.at)
    )
}

#[async_trait]
impl SignalNotifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn notify_signal(&self, signal: &Signal) -> Result<()> {
        self.send_message(&format_signal(signal)).await
    }

    async fn notify_emergency(&self, event: &EmergencyStopEvent) -> Result<()> {
        self.send_message(&format_emergency(event)).await
    }
}
