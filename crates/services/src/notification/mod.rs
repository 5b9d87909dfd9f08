//! 信号与紧急停止的对外通知

mod telegram;

pub use telegram::TelegramNotifier;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use sniper_common::EnumAsStrTrait;
use sniper_risk::EmergencyStopEvent;

use crate::signal::Signal;

/// 通知出口
#[async_trait]
pub trait SignalNotifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify_signal(&self, signal: &Signal) -> Result<()>;

    async fn notify_emergency(&self, event: &EmergencyStopEvent) -> Result<()>;
}

/// 只写日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl SignalNotifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify_signal(&self, signal: &Signal) -> Result<()> {
        info!(
            signal_id = %signal.id,
            "📈 信号 {} {} {} 置信度={:.1} 质量={} 仓位={:.2} 风险={}",
            signal.symbol,
            signal.timeframe.as_str(),
            signal.direction,
            signal.confidence,
            signal.quality.as_str(),
            signal.position.amount,
            signal.risk_assessment.level.as_str()
        );
        Ok(())
    }

    async fn notify_emergency(&self, event: &EmergencyStopEvent) -> Result<()> {
        warn!(
            "🛑 紧急停止: {} (连亏 {} 次, at={})",
            event.reason, event.consecutive_losses, event.at
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    Signal(Signal),
    EmergencyStop(EmergencyStopEvent),
}

/// 进程内通道，供嵌入方或测试消费
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: NotificationEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| anyhow::anyhow!("通知通道已关闭"))
    }
}

#[async_trait]
impl SignalNotifier for ChannelNotifier {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn notify_signal(&self, signal: &Signal) -> Result<()> {
        self.send(NotificationEvent::Signal(signal.clone()))
    }

    async fn notify_emergency(&self, event: &EmergencyStopEvent) -> Result<()> {
        self.send(NotificationEvent::EmergencyStop(event.clone()))
    }
}
