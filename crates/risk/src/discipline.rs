//! 交易纪律状态机
//!
//! `evaluate` 是唯一会在检查路径上修改状态的入口：
//! 跨日清零日计数、清除已过期的暂停、连亏达到上限时开始暂停，三者都在返回值里可见。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use sniper_common::TradeResult;
use sniper_core::config::{env_i64, env_u32};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineConfig {
    pub max_session_trades: u32,
    pub max_daily_trades: u32,
    pub min_signal_interval_ms: i64,
    pub max_loss_streak: u32,
    pub pause_duration_ms: i64,
}

impl Default for DisciplineConfig {
    fn default() -> Self {
        Self {
            max_session_trades: 10,
            max_daily_trades: 20,
            min_signal_interval_ms: 60_000,
            max_loss_streak: 3,
            pause_duration_ms: 30 * 60 * 1000,
        }
    }
}

impl DisciplineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_session_trades: env_u32("MAX_SESSION_TRADES", d.max_session_trades),
            max_daily_trades: env_u32("MAX_DAILY_TRADES", d.max_daily_trades),
            min_signal_interval_ms: env_i64("MIN_SIGNAL_INTERVAL_MS", d.min_signal_interval_ms)
                .max(0),
            max_loss_streak: env_u32("MAX_LOSS_STREAK", d.max_loss_streak),
            pause_duration_ms: env_i64("PAUSE_DURATION_MS", d.pause_duration_ms).max(0),
        }
    }
}

/// 持久化的纪律状态，缺失字段取默认值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisciplineState {
    pub session_trades: u32,
    pub daily_trades: u32,
    pub loss_streak: u32,
    pub paused_until: Option<i64>,
    pub last_signal_time: Option<i64>,
    pub trading_day: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    Paused { until: i64 },
    SessionLimit { trades: u32, max: u32 },
    DailyLimit { trades: u32, max: u32 },
    MinInterval { remaining_ms: i64 },
    LossStreakPause { streak: u32, until: i64 },
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::Paused { until } => write!(f, "paused until {}", until),
            BlockReason::SessionLimit { trades, max } => {
                write!(f, "session limit reached ({}/{})", trades, max)
            }
            BlockReason::DailyLimit { trades, max } => {
                write!(f, "daily limit reached ({}/{})", trades, max)
            }
            BlockReason::MinInterval { remaining_ms } => {
                write!(f, "minimum signal interval, {}ms remaining", remaining_ms)
            }
            BlockReason::LossStreakPause { streak, until } => {
                write!(f, "{} consecutive losses, paused until {}", streak, until)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum DisciplineDecision {
    Allowed,
    Blocked {
        reason: BlockReason,
        /// 本次检查是否新开始了暂停
        pause_started: bool,
    },
}

impl DisciplineDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, DisciplineDecision::Allowed)
    }

    fn blocked(reason: BlockReason) -> Self {
        DisciplineDecision::Blocked {
            reason,
            pause_started: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisciplineEngine {
    config: DisciplineConfig,
    state: DisciplineState,
}

impl DisciplineEngine {
    pub fn new(config: DisciplineConfig) -> Self {
        Self::with_state(config, DisciplineState::default())
    }

    pub fn with_state(config: DisciplineConfig, state: DisciplineState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &DisciplineConfig {
        &self.config
    }

    pub fn state(&self) -> &DisciplineState {
        &self.state
    }

    /// 本地日期变化时清零日计数
    fn roll_day(&mut self, today: NaiveDate) {
        if self.state.trading_day != Some(today) {
            if self.state.trading_day.is_some() {
                info!(
                    "交易日切换 {:?} -> {}，日计数 {} 清零",
                    self.state.trading_day, today, self.state.daily_trades
                );
            }
            self.state.daily_trades = 0;
            self.state.trading_day = Some(today);
        }
    }

    /// 按顺序检查：暂停、连亏、会话上限、日上限、最小间隔
    ///
    /// 连亏达到上限时无论其他限制是否命中都立即开始暂停
    pub fn evaluate(&mut self, now_ms: i64, today: NaiveDate) -> DisciplineDecision {
        self.roll_day(today);
        let cfg = &self.config;

        if let Some(until) = self.state.paused_until {
            if now_ms < until {
                return DisciplineDecision::blocked(BlockReason::Paused { until });
            }
            info!("连亏暂停结束，连亏计数 {} 清零", self.state.loss_streak);
            self.state.paused_until = None;
            self.state.loss_streak = 0;
        }

        if cfg.max_loss_streak > 0 && self.state.loss_streak >= cfg.max_loss_streak {
            let until = now_ms + cfg.pause_duration_ms;
            self.state.paused_until = Some(until);
            info!(
                "连亏 {} 次，暂停到 {}",
                self.state.loss_streak, until
            );
            return DisciplineDecision::Blocked {
                reason: BlockReason::LossStreakPause {
                    streak: self.state.loss_streak,
                    until,
                },
                pause_started: true,
            };
        }

        if self.state.session_trades >= cfg.max_session_trades {
            return DisciplineDecision::blocked(BlockReason::SessionLimit {
                trades: self.state.session_trades,
                max: cfg.max_session_trades,
            });
        }

        if self.state.daily_trades >= cfg.max_daily_trades {
            return DisciplineDecision::blocked(BlockReason::DailyLimit {
                trades: self.state.daily_trades,
                max: cfg.max_daily_trades,
            });
        }

        if let Some(last) = self.state.last_signal_time {
            let elapsed = now_ms - last;
            if elapsed < cfg.min_signal_interval_ms {
                return DisciplineDecision::blocked(BlockReason::MinInterval {
                    remaining_ms: cfg.min_signal_interval_ms - elapsed,
                });
            }
        }

        DisciplineDecision::Allowed
    }

    pub fn can_emit(&mut self, now_ms: i64, today: NaiveDate) -> bool {
        self.evaluate(now_ms, today).is_allowed()
    }

    pub fn record_signal_shown(&mut self, now_ms: i64, today: NaiveDate) {
        self.roll_day(today);
        self.state.session_trades += 1;
        self.state.daily_trades += 1;
        self.state.last_signal_time = Some(now_ms);
    }

    pub fn record_trade_result(&mut self, result: TradeResult) {
        match result {
            TradeResult::Win => self.state.loss_streak = 0,
            TradeResult::Loss => self.state.loss_streak += 1,
            _ => {}
        }
    }

    pub fn reset_session(&mut self) {
        self.state.session_trades = 0;
    }

    pub fn is_paused(&self, now_ms: i64) -> bool {
        self.state.paused_until.map_or(false, |until| now_ms < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn engine() -> DisciplineEngine {
        DisciplineEngine::new(DisciplineConfig::default())
    }

    #[test]
    fn test_fresh_engine_allows() {
        let mut e = engine();
        assert_eq!(e.evaluate(T0, day(1)), DisciplineDecision::Allowed);
        assert_eq!(e.state().trading_day, Some(day(1)));
    }

    #[test]
    fn test_min_interval() {
        let mut e = engine();
        e.record_signal_shown(T0, day(1));
        match e.evaluate(T0 + 10_000, day(1)) {
            DisciplineDecision::Blocked {
                reason: BlockReason::MinInterval { remaining_ms },
                pause_started,
            } => {
                assert_eq!(remaining_ms, 50_000);
                assert!(!pause_started);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(e.can_emit(T0 + 60_000, day(1)));
    }

    #[test]
    fn test_loss_streak_starts_pause() {
        let mut e = engine();
        for _ in 0..3 {
            e.record_trade_result(TradeResult::Loss);
        }
        let decision = e.evaluate(T0, day(1));
        assert_eq!(
            decision,
            DisciplineDecision::Blocked {
                reason: BlockReason::LossStreakPause {
                    streak: 3,
                    until: T0 + 1_800_000
                },
                pause_started: true,
            }
        );
        assert!(e.state().paused_until.unwrap() > T0);
        assert!(!e.can_emit(T0 + 1, day(1)));
        assert!(matches!(
            e.evaluate(T0 + 1_000, day(1)),
            DisciplineDecision::Blocked {
                reason: BlockReason::Paused { .. },
                pause_started: false
            }
        ));
    }

    #[test]
    fn test_loss_streak_pause_starts_inside_min_interval() {
        let mut e = engine();
        e.record_signal_shown(T0, day(1));
        for _ in 0..3 {
            e.record_trade_result(TradeResult::Loss);
        }
        let decision = e.evaluate(T0 + 10_000, day(1));
        assert_eq!(
            decision,
            DisciplineDecision::Blocked {
                reason: BlockReason::LossStreakPause {
                    streak: 3,
                    until: T0 + 10_000 + 1_800_000
                },
                pause_started: true,
            }
        );
        assert!(e.state().paused_until.unwrap() > T0 + 10_000);
    }

    #[test]
    fn test_loss_streak_pause_starts_at_session_limit() {
        let config = DisciplineConfig {
            max_session_trades: 1,
            ..DisciplineConfig::default()
        };
        let mut e = DisciplineEngine::new(config);
        e.record_signal_shown(T0, day(1));
        for _ in 0..3 {
            e.record_trade_result(TradeResult::Loss);
        }
        assert!(!e.can_emit(T0 + 120_000, day(1)));
        assert!(e.is_paused(T0 + 120_001));
    }

    #[test]
    fn test_expired_pause_clears_streak() {
        let mut e = engine();
        for _ in 0..3 {
            e.record_trade_result(TradeResult::Loss);
        }
        assert!(!e.can_emit(T0, day(1)));
        assert!(e.can_emit(T0 + 1_800_000, day(1)));
        assert_eq!(e.state().loss_streak, 0);
        assert_eq!(e.state().paused_until, None);
    }

    #[test]
    fn test_win_resets_streak_other_results_do_not() {
        let mut e = engine();
        e.record_trade_result(TradeResult::Loss);
        e.record_trade_result(TradeResult::Loss);
        e.record_trade_result(TradeResult::Breakeven);
        e.record_trade_result(TradeResult::Expired);
        assert_eq!(e.state().loss_streak, 2);
        e.record_trade_result(TradeResult::Win);
        assert_eq!(e.state().loss_streak, 0);
    }

    #[test]
    fn test_session_and_daily_limits() {
        let config = DisciplineConfig {
            max_session_trades: 2,
            max_daily_trades: 3,
            min_signal_interval_ms: 0,
            ..DisciplineConfig::default()
        };
        let mut e = DisciplineEngine::new(config);
        e.record_signal_shown(T0, day(1));
        e.record_signal_shown(T0, day(1));
        assert!(matches!(
            e.evaluate(T0, day(1)),
            DisciplineDecision::Blocked {
                reason: BlockReason::SessionLimit { trades: 2, max: 2 },
                ..
            }
        ));
        e.reset_session();
        e.record_signal_shown(T0, day(1));
        assert!(matches!(
            e.evaluate(T0, day(1)),
            DisciplineDecision::Blocked {
                reason: BlockReason::DailyLimit { trades: 3, max: 3 },
                ..
            }
        ));
        e.reset_session();
        // 次日自动清零
        assert!(e.can_emit(T0, day(2)));
        assert_eq!(e.state().daily_trades, 0);
    }

    #[test]
    fn test_state_deserializes_with_missing_fields() {
        let state: DisciplineState = serde_json::from_str(r#"{"loss_streak": 2}"#).unwrap();
        assert_eq!(state.loss_streak, 2);
        assert_eq!(state.session_trades, 0);
        assert!(state.paused_until.is_none());
    }
}
