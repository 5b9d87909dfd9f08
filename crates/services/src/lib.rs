//! # OTC Sniper Services
//!
//! 应用服务层：把数据源、指标、估计器、共识与风控串成一条信号流水线
//!
//! ## 架构位置
//!
//! ```text
//! orchestration (调度) → services (业务协调) → strategies + risk + market + infrastructure
//! ```
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use sniper_services::{SignalService, SniperConfig};
//!
//! let config = SniperConfig::from_env();
//! let store = config.state_backend.open().await?;
//! let service = SignalService::from_config(config, store).await?;
//! let outcome = service.generate_signal("EURUSD OTC", Timeframe::M1).await?;
//! ```

pub mod config;
pub mod governance;
pub mod notification;
pub mod signal;
pub mod signal_service;

pub use config::{parse_targets, parse_timeframes, SignalConfig, SignalTarget, SniperConfig};
pub use governance::{Governance, DISCIPLINE_KEY, HISTORY_KEY, LEDGER_KEY, RISK_KEY};
pub use notification::{
    ChannelNotifier, LogNotifier, NotificationEvent, SignalNotifier, TelegramNotifier,
};
pub use signal::{Signal, SignalOutcome, WithheldReason};
pub use signal_service::{OutcomeReport, ServiceStatus, SignalService};
