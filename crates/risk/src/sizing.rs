//! 仓位建议
//!
//! 基础风险比例依次按置信度、波动率、连亏、连胜调整，最后夹到 [min, max] 区间。

use serde::{Deserialize, Serialize};
use tracing::debug;

use sniper_common::{TradeResult, VolatilityLevel};
use sniper_core::config::env_f64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    pub account_balance: f64,
    pub base_risk_percent: f64,
    pub min_risk_percent: f64,
    pub max_risk_percent: f64,
    /// 盈利时的收益比例，0.8 表示赢得下注额的 80%
    pub payout_ratio: f64,
    pub min_trade_amount: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_balance: 1000.0,
            base_risk_percent: 2.0,
            min_risk_percent: 0.5,
            max_risk_percent: 5.0,
            payout_ratio: 0.8,
            min_trade_amount: 1.0,
        }
    }
}

impl RiskConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            account_balance: env_f64("ACCOUNT_BALANCE", d.account_balance),
            base_risk_percent: env_f64("BASE_RISK_PERCENT", d.base_risk_percent),
            min_risk_percent: env_f64("MIN_RISK_PERCENT", d.min_risk_percent),
            max_risk_percent: env_f64("MAX_RISK_PERCENT", d.max_risk_percent),
            payout_ratio: env_f64("PAYOUT_RATIO", d.payout_ratio),
            min_trade_amount: env_f64("MIN_TRADE_AMOUNT", d.min_trade_amount),
        }
    }

    /// 结算时未给出盈亏的默认值
    pub fn default_profit(&self, result: TradeResult, amount: f64) -> f64 {
        match result {
            TradeResult::Win => round_cents(amount * self.payout_ratio),
            TradeResult::Loss => -amount,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskState {
    pub account_balance: f64,
    pub base_risk_percent: f64,
    pub consecutive_wins: u32,
    pub consecutive_losses: u32,
}

impl Default for RiskState {
    fn default() -> Self {
        Self::from_config(&RiskConfig::default())
    }
}

impl RiskState {
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            account_balance: config.account_balance,
            base_risk_percent: config.base_risk_percent,
            consecutive_wins: 0,
            consecutive_losses: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecommendation {
    pub amount: f64,
    pub risk_percent: f64,
    pub reasoning: Vec<String>,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    state: RiskState,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        let state = RiskState::from_config(&config);
        Self { config, state }
    }

    pub fn with_state(config: RiskConfig, state: RiskState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// 根据 0-100 置信度和当前波动率给出建议下注额
    pub fn recommend(&self, confidence_pct: f64, volatility: VolatilityLevel) -> PositionRecommendation {
        let cfg = &self.config;
        let mut risk = self.state.base_risk_percent;
        let mut reasoning = vec![format!("base risk {:.2}%", risk)];

        if confidence_pct >= 85.0 {
            risk *= 1.2;
            reasoning.push("high confidence x1.2".to_string());
        } else if confidence_pct < 70.0 {
            risk *= 0.8;
            reasoning.push("low confidence x0.8".to_string());
        }

        match volatility {
            VolatilityLevel::High => {
                risk *= 0.7;
                reasoning.push("high volatility x0.7".to_string());
            }
            VolatilityLevel::Low => {
                risk *= 0.9;
                reasoning.push("low volatility x0.9".to_string());
            }
            VolatilityLevel::Normal => {}
        }

        if self.state.consecutive_losses >= 2 {
            risk *= 0.5;
            reasoning.push(format!(
                "{} consecutive losses x0.5",
                self.state.consecutive_losses
            ));
        } else if self.state.consecutive_wins >= 3 {
            risk *= 0.8;
            reasoning.push(format!(
                "{} consecutive wins x0.8",
                self.state.consecutive_wins
            ));
        }

        let clamped = risk.clamp(cfg.min_risk_percent, cfg.max_risk_percent);
        if (clamped - risk).abs() > f64::EPSILON {
            reasoning.push(format!(
                "clamped to [{:.2}%, {:.2}%]",
                cfg.min_risk_percent, cfg.max_risk_percent
            ));
        }

        let balance = self.state.account_balance.max(0.0);
        let mut amount = round_cents(balance * clamped / 100.0);
        if amount < cfg.min_trade_amount {
            if balance >= cfg.min_trade_amount {
                amount = cfg.min_trade_amount;
                reasoning.push(format!("raised to minimum trade {:.2}", cfg.min_trade_amount));
            } else {
                amount = (balance * 100.0).floor() / 100.0;
                reasoning.push("balance below minimum trade".to_string());
            }
        }

        debug!(
            "仓位建议 confidence={:.1} volatility={:?} risk={:.3}% amount={:.2}",
            confidence_pct, volatility, clamped, amount
        );

        PositionRecommendation {
            amount,
            risk_percent: (clamped * 1000.0).round() / 1000.0,
            reasoning,
        }
    }

    /// 结算后更新余额与连胜连亏计数，平局、过期、取消不改变状态
    pub fn record_trade_result(&mut self, result: TradeResult, amount: f64) {
        match result {
            TradeResult::Win => {
                self.state.account_balance =
                    round_cents(self.state.account_balance + amount * self.config.payout_ratio);
                self.state.consecutive_wins += 1;
                self.state.consecutive_losses = 0;
            }
            TradeResult::Loss => {
                self.state.account_balance = round_cents(self.state.account_balance - amount);
                self.state.consecutive_losses += 1;
                self.state.consecutive_wins = 0;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_base_recommendation() {
        let manager = RiskManager::new(RiskConfig::default());
        let rec = manager.recommend(75.0, VolatilityLevel::Normal);
        assert!(approx_eq!(f64, rec.risk_percent, 2.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, rec.amount, 20.0, epsilon = 1e-9));
        assert_eq!(rec.reasoning.len(), 1);
    }

    #[test]
    fn test_high_confidence_high_volatility() {
        let manager = RiskManager::new(RiskConfig::default());
        let rec = manager.recommend(90.0, VolatilityLevel::High);
        // 2.0 * 1.2 * 0.7 = 1.68
        assert!(approx_eq!(f64, rec.risk_percent, 1.68, epsilon = 1e-9));
        assert!(approx_eq!(f64, rec.amount, 16.8, epsilon = 1e-9));
    }

    #[test]
    fn test_loss_streak_halves_and_clamps() {
        let mut manager = RiskManager::new(RiskConfig::default());
        manager.record_trade_result(TradeResult::Loss, 20.0);
        manager.record_trade_result(TradeResult::Loss, 20.0);
        assert!(approx_eq!(f64, manager.state().account_balance, 960.0, epsilon = 1e-9));
        // 2.0 * 0.8 * 0.9 * 0.5 = 0.72
        let rec = manager.recommend(60.0, VolatilityLevel::Low);
        assert!(approx_eq!(f64, rec.risk_percent, 0.72, epsilon = 1e-9));

        let config = RiskConfig {
            base_risk_percent: 0.6,
            ..RiskConfig::default()
        };
        let mut low = RiskManager::new(config);
        low.record_trade_result(TradeResult::Loss, 1.0);
        low.record_trade_result(TradeResult::Loss, 1.0);
        let rec = low.recommend(60.0, VolatilityLevel::High);
        assert!(approx_eq!(f64, rec.risk_percent, 0.5, epsilon = 1e-9));
    }

    #[test]
    fn test_win_streak_reduces_risk() {
        let mut manager = RiskManager::new(RiskConfig::default());
        for _ in 0..3 {
            manager.record_trade_result(TradeResult::Win, 10.0);
        }
        assert_eq!(manager.state().consecutive_wins, 3);
        assert!(approx_eq!(f64, manager.state().account_balance, 1024.0, epsilon = 1e-9));
        let rec = manager.recommend(75.0, VolatilityLevel::Normal);
        assert!(approx_eq!(f64, rec.risk_percent, 1.6, epsilon = 1e-9));

        manager.record_trade_result(TradeResult::Expired, 10.0);
        assert_eq!(manager.state().consecutive_wins, 3);
    }

    #[test]
    fn test_minimum_trade_amount() {
        let config = RiskConfig {
            account_balance: 30.0,
            ..RiskConfig::default()
        };
        let rec = RiskManager::new(config.clone()).recommend(75.0, VolatilityLevel::Normal);
        assert!(approx_eq!(f64, rec.amount, 1.0, epsilon = 1e-9));

        let broke = RiskConfig {
            account_balance: 0.5,
            ..config
        };
        let rec = RiskManager::new(broke).recommend(75.0, VolatilityLevel::Normal);
        assert!(approx_eq!(f64, rec.amount, 0.5, epsilon = 1e-9));
    }

    #[test]
    fn test_default_profit() {
        let config = RiskConfig::default();
        assert!(approx_eq!(f64, config.default_profit(TradeResult::Win, 10.0), 8.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, config.default_profit(TradeResult::Loss, 10.0), -10.0, epsilon = 1e-9));
        assert_eq!(config.default_profit(TradeResult::Breakeven, 10.0), 0.0);
    }
}
