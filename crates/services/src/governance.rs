//! 治理状态的唯一持有者
//!
//! 纪律、风控、账本、信号历史放在同一个结构里，由服务层用一把锁保护；
//! 每次修改后在持锁期间写回存储。

use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use sniper_infrastructure::{load_json, load_json_or_default, save_json, StateStore, StoreError};
use sniper_risk::{
    DisciplineConfig, DisciplineEngine, DisciplineState, LedgerConfig, LedgerSnapshot, RiskConfig,
    RiskManager, RiskState, TradeLedger,
};

use crate::signal::Signal;

pub const DISCIPLINE_KEY: &str = "discipline_state";
pub const RISK_KEY: &str = "risk_state";
pub const LEDGER_KEY: &str = "trade_ledger";
pub const HISTORY_KEY: &str = "signal_history";

pub struct Governance {
    pub discipline: DisciplineEngine,
    pub risk: RiskManager,
    pub ledger: TradeLedger,
    history: VecDeque<Signal>,
    history_limit: usize,
}

/// 读取记录，缺失或损坏时用 `fallback` 构造
async fn load_or<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
    fallback: impl FnOnce() -> T,
) -> Result<T, StoreError> {
    match load_json(store, key).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Ok(fallback()),
        Err(e) if e.is_corrupt() => {
            warn!("状态记录 {} 损坏，重置为默认值: {}", key, e);
            Ok(fallback())
        }
        Err(e) => Err(e),
    }
}

impl Governance {
    pub fn new(
        discipline: DisciplineConfig,
        risk: RiskConfig,
        ledger: LedgerConfig,
        history_limit: usize,
    ) -> Self {
        Self {
            discipline: DisciplineEngine::new(discipline),
            risk: RiskManager::new(risk),
            ledger: TradeLedger::new(ledger),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// 从存储恢复全部治理状态
    pub async fn load(
        store: &dyn StateStore,
        discipline: DisciplineConfig,
        risk: RiskConfig,
        ledger: LedgerConfig,
        history_limit: usize,
    ) -> Result<Self, StoreError> {
        let discipline_state: DisciplineState = load_json_or_default(store, DISCIPLINE_KEY).await?;
        let risk_state = load_or(store, RISK_KEY, || RiskState::from_config(&risk)).await?;
        let ledger_snapshot: LedgerSnapshot = load_json_or_default(store, LEDGER_KEY).await?;
        let history: Vec<Signal> = load_json_or_default(store, HISTORY_KEY).await?;

        let mut governance = Self {
            discipline: DisciplineEngine::with_state(discipline, discipline_state),
            risk: RiskManager::with_state(risk, risk_state),
            ledger: TradeLedger::from_snapshot(ledger, ledger_snapshot),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        };
        for signal in history {
            governance.push_history(signal);
        }
        info!(
            "治理状态已恢复: 账本 {} 条, 历史信号 {} 条, 紧急停止={}",
            governance.ledger.len(),
            governance.history.len(),
            governance.ledger.is_emergency_active()
        );
        Ok(governance)
    }

    pub fn push_history(&mut self, signal: Signal) {
        self.history.push_back(signal);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// 最近的 n 个信号，新的在前
    pub fn recent_signals(&self, n: usize) -> Vec<Signal> {
        self.history.iter().rev().take(n).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub async fn save_discipline(&self, store: &dyn StateStore) -> Result<(), StoreError> {
        save_json(store, DISCIPLINE_KEY, self.discipline.state()).await
    }

    pub async fn save_risk(&self, store: &dyn StateStore) -> Result<(), StoreError> {
        save_json(store, RISK_KEY, self.risk.state()).await
    }

    pub async fn save_ledger(&self, store: &dyn StateStore) -> Result<(), StoreError> {
        save_json(store, LEDGER_KEY, &self.ledger.snapshot()).await
    }

    pub async fn save_history(&self, store: &dyn StateStore) -> Result<(), StoreError> {
        let history: Vec<&Signal> = self.history.iter().collect();
        save_json(store, HISTORY_KEY, &history).await
    }

    pub async fn save_all(&self, store: &dyn StateStore) -> Result<(), StoreError> {
        self.save_discipline(store).await?;
        self.save_risk(store).await?;
        self.save_ledger(store).await?;
        self.save_history(store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sniper_common::TradeResult;
    use sniper_infrastructure::MemoryStateStore;

    #[tokio::test]
    async fn test_missing_state_uses_config_defaults() {
        let store = MemoryStateStore::new();
        let risk = RiskConfig {
            account_balance: 250.0,
            ..RiskConfig::default()
        };
        let gov = Governance::load(
            &store,
            DisciplineConfig::default(),
            risk,
            LedgerConfig::default(),
            10,
        )
        .await
        .unwrap();
        assert_eq!(gov.risk.state().account_balance, 250.0);
        assert_eq!(gov.discipline.state().loss_streak, 0);
        assert!(!gov.ledger.is_emergency_active());
    }

    #[tokio::test]
    async fn test_corrupt_records_degrade_to_defaults() {
        let store = MemoryStateStore::new();
        store.save(LEDGER_KEY, "{not json").await.unwrap();
        store.save(DISCIPLINE_KEY, "\"oops\"").await.unwrap();
        let gov = Governance::load(
            &store,
            DisciplineConfig::default(),
            RiskConfig::default(),
            LedgerConfig::default(),
            10,
        )
        .await
        .unwrap();
        assert!(gov.ledger.is_empty());
        assert!(!gov.ledger.is_emergency_active());
    }

    #[tokio::test]
    async fn test_save_and_restore() {
        let store = MemoryStateStore::new();
        let mut gov = Governance::new(
            DisciplineConfig::default(),
            RiskConfig::default(),
            LedgerConfig::default(),
            10,
        );
        gov.discipline.record_trade_result(TradeResult::Loss);
        gov.risk.record_trade_result(TradeResult::Loss, 20.0);
        gov.ledger.activate("manual", 1);
        gov.save_all(&store).await.unwrap();

        let restored = Governance::load(
            &store,
            DisciplineConfig::default(),
            RiskConfig::default(),
            LedgerConfig::default(),
            10,
        )
        .await
        .unwrap();
        assert_eq!(restored.discipline.state().loss_streak, 1);
        assert_eq!(restored.risk.state().account_balance, 980.0);
        assert!(restored.ledger.is_emergency_active());
    }
}
