//! 交易账本与紧急停止
//!
//! 账本按时间顺序保存最近的交易记录，连续亏损达到上限时自动触发紧急停止。
//! 紧急停止只能手动复位。

use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use sniper_common::utils::time::local_date_of;
use sniper_common::{Direction, Timeframe, TradeResult};
use sniper_core::config::{env_u32, env_usize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub max_records: usize,
    pub max_consecutive_losses: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_records: 1000,
            max_consecutive_losses: 3,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_records: env_usize("LEDGER_MAX_RECORDS", d.max_records).max(1),
            max_consecutive_losses: env_u32("MAX_CONSECUTIVE_LOSSES", d.max_consecutive_losses),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub signal_id: Option<String>,
    pub timestamp: i64,
    pub direction: Direction,
    pub amount: f64,
    pub asset: String,
    pub timeframe: Timeframe,
    /// 0-100
    pub confidence: f64,
    pub result: TradeResult,
    pub profit: f64,
}

impl TradeRecord {
    /// 信号发出时登记的待结算记录
    pub fn pending(
        signal_id: &str,
        timestamp: i64,
        direction: Direction,
        amount: f64,
        asset: &str,
        timeframe: Timeframe,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            signal_id: Some(signal_id.to_string()),
            timestamp,
            direction,
            amount,
            asset: asset.to_string(),
            timeframe,
            confidence,
            result: TradeResult::Pending,
            profit: 0.0,
        }
    }
}

/// 外部上报的交易结果，按 signal_id 或 (timestamp, direction) 匹配待结算记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    #[serde(default)]
    pub signal_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub direction: Option<Direction>,
    pub result: TradeResult,
    #[serde(default)]
    pub profit: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub asset: Option<String>,
}

impl TradeOutcome {
    pub fn for_signal(signal_id: &str, result: TradeResult) -> Self {
        Self {
            signal_id: Some(signal_id.to_string()),
            timestamp: None,
            direction: None,
            result,
            profit: None,
            amount: None,
            asset: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyStop {
    pub active: bool,
    pub activated_at: Option<i64>,
    pub reason: Option<String>,
}

/// 自动触发紧急停止时发出的事件，用于通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyStopEvent {
    pub reason: String,
    pub consecutive_losses: u32,
    pub at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total: usize,
    pub settled: usize,
    pub pending: usize,
    pub wins: usize,
    pub losses: usize,
    /// 百分比，分母为已结算的胜负场次
    pub win_rate: f64,
    pub net_profit: f64,
    pub trades_today: usize,
    pub consecutive_losses: u32,
}

/// 持久化格式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSnapshot {
    pub records: Vec<TradeRecord>,
    pub emergency_stop: EmergencyStop,
}

#[derive(Debug, Clone)]
pub struct TradeLedger {
    config: LedgerConfig,
    records: VecDeque<TradeRecord>,
    emergency: EmergencyStop,
}

impl TradeLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            records: VecDeque::new(),
            emergency: EmergencyStop::default(),
        }
    }

    pub fn from_snapshot(config: LedgerConfig, snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new(config);
        ledger.emergency = snapshot.emergency_stop;
        for record in snapshot.records {
            ledger.push(record);
        }
        ledger
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            records: self.records.iter().cloned().collect(),
            emergency_stop: self.emergency.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 最新的 n 条记录，新的在前
    pub fn recent(&self, n: usize) -> Vec<TradeRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    pub fn emergency(&self) -> &EmergencyStop {
        &self.emergency
    }

    pub fn is_emergency_active(&self) -> bool {
        self.emergency.active
    }

    fn push(&mut self, record: TradeRecord) {
        self.records.push_back(record);
        while self.records.len() > self.config.max_records {
            self.records.pop_front();
        }
    }

    pub fn append(&mut self, record: TradeRecord) {
        self.push(record);
    }

    fn find_pending(&self, outcome: &TradeOutcome) -> Option<usize> {
        let pending = |r: &TradeRecord| r.result == TradeResult::Pending;
        if let Some(signal_id) = &outcome.signal_id {
            if let Some(idx) = self
                .records
                .iter()
                .rposition(|r| pending(r) && r.signal_id.as_deref() == Some(signal_id.as_str()))
            {
                return Some(idx);
            }
        }
        match (outcome.timestamp, outcome.direction) {
            (Some(ts), Some(direction)) => self
                .records
                .iter()
                .rposition(|r| pending(r) && r.timestamp == ts && r.direction == direction),
            _ => None,
        }
    }

    /// 结算一条交易。找不到待结算记录时按上报内容新建一条已结算记录
    ///
    /// # 参数
    /// * `default_profit` - 上报未带盈亏时，由 (结果, 下注额) 计算盈亏
    ///
    /// # 返回
    /// 结算后的记录
    pub fn settle(
        &mut self,
        outcome: &TradeOutcome,
        now_ms: i64,
        default_profit: impl Fn(TradeResult, f64) -> f64,
    ) -> TradeRecord {
        match self.find_pending(outcome) {
            Some(idx) => {
                let record = &mut self.records[idx];
                if let Some(amount) = outcome.amount {
                    record.amount = amount;
                }
                record.result = outcome.result;
                record.profit = outcome
                    .profit
                    .unwrap_or_else(|| default_profit(outcome.result, record.amount));
                info!(
                    "交易结算 id={} signal={:?} result={:?} profit={:.2}",
                    record.id, record.signal_id, record.result, record.profit
                );
                record.clone()
            }
            None => {
                let amount = outcome.amount.unwrap_or(0.0);
                let record = TradeRecord {
                    id: Uuid::new_v4().to_string(),
                    signal_id: outcome.signal_id.clone(),
                    timestamp: outcome.timestamp.unwrap_or(now_ms),
                    direction: outcome.direction.unwrap_or(Direction::Up),
                    amount,
                    asset: outcome.asset.clone().unwrap_or_else(|| "unknown".to_string()),
                    timeframe: Timeframe::M5,
                    confidence: 0.0,
                    result: outcome.result,
                    profit: outcome
                        .profit
                        .unwrap_or_else(|| default_profit(outcome.result, amount)),
                };
                warn!(
                    "未找到待结算记录，按上报内容登记 signal={:?} result={:?}",
                    outcome.signal_id, outcome.result
                );
                self.push(record.clone());
                record
            }
        }
    }

    /// 从最新记录往前数连续亏损，跳过待结算记录，遇到第一条非亏损的已结算记录停止
    pub fn calculate_consecutive_losses(&self) -> u32 {
        let mut losses = 0;
        for record in self.records.iter().rev() {
            match record.result {
                TradeResult::Pending => continue,
                TradeResult::Loss => losses += 1,
                _ => break,
            }
        }
        losses
    }

    /// 连亏达到上限且尚未停止时触发紧急停止
    pub fn check_emergency(&mut self, now_ms: i64) -> Option<EmergencyStopEvent> {
        if self.emergency.active || self.config.max_consecutive_losses == 0 {
            return None;
        }
        let losses = self.calculate_consecutive_losses();
        if losses < self.config.max_consecutive_losses {
            return None;
        }
        let reason = format!("{} consecutive losses", losses);
        self.activate(&reason, now_ms);
        Some(EmergencyStopEvent {
            reason,
            consecutive_losses: losses,
            at: now_ms,
        })
    }

    pub fn activate(&mut self, reason: &str, now_ms: i64) {
        warn!("紧急停止已激活: {}", reason);
        self.emergency = EmergencyStop {
            active: true,
            activated_at: Some(now_ms),
            reason: Some(reason.to_string()),
        };
    }

    /// 手动复位，交易记录保留
    pub fn reset(&mut self) {
        info!("紧急停止已复位");
        self.emergency = EmergencyStop::default();
    }

    pub fn stats(&self, today: NaiveDate) -> LedgerStats {
        let mut stats = LedgerStats {
            total: self.records.len(),
            settled: 0,
            pending: 0,
            wins: 0,
            losses: 0,
            win_rate: 0.0,
            net_profit: 0.0,
            trades_today: 0,
            consecutive_losses: self.calculate_consecutive_losses(),
        };
        for record in &self.records {
            match record.result {
                TradeResult::Pending => stats.pending += 1,
                TradeResult::Win => stats.wins += 1,
                TradeResult::Loss => stats.losses += 1,
                _ => {}
            }
            if record.result.is_settled() {
                stats.settled += 1;
                stats.net_profit += record.profit;
            }
            if local_date_of(record.timestamp) == today {
                stats.trades_today += 1;
            }
        }
        let decided = stats.wins + stats.losses;
        if decided > 0 {
            stats.win_rate = (stats.wins as f64 / decided as f64 * 1000.0).round() / 10.0;
        }
        stats.net_profit = (stats.net_profit * 100.0).round() / 100.0;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    const T0: i64 = 1_700_000_000_000;

    fn profit(result: TradeResult, amount: f64) -> f64 {
        match result {
            TradeResult::Win => amount * 0.8,
            TradeResult::Loss => -amount,
            _ => 0.0,
        }
    }

    fn pending(signal: &str, ts: i64) -> TradeRecord {
        TradeRecord::pending(signal, ts, Direction::Up, 10.0, "EURUSD_otc", Timeframe::M5, 72.0)
    }

    #[test]
    fn test_settle_by_signal_id() {
        let mut ledger = TradeLedger::new(LedgerConfig::default());
        ledger.append(pending("s1", T0));
        let settled = ledger.settle(&TradeOutcome::for_signal("s1", TradeResult::Win), T0, profit);
        assert_eq!(settled.result, TradeResult::Win);
        assert!(approx_eq!(f64, settled.profit, 8.0, epsilon = 1e-9));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_settle_by_timestamp_and_direction() {
        let mut ledger = TradeLedger::new(LedgerConfig::default());
        ledger.append(pending("s1", T0));
        let outcome = TradeOutcome {
            signal_id: None,
            timestamp: Some(T0),
            direction: Some(Direction::Up),
            result: TradeResult::Loss,
            profit: Some(-9.5),
            amount: None,
            asset: None,
        };
        let settled = ledger.settle(&outcome, T0, profit);
        assert_eq!(settled.signal_id.as_deref(), Some("s1"));
        assert!(approx_eq!(f64, settled.profit, -9.5, epsilon = 1e-9));
    }

    #[test]
    fn test_unmatched_outcome_is_recorded() {
        let mut ledger = TradeLedger::new(LedgerConfig::default());
        ledger.settle(&TradeOutcome::for_signal("ghost", TradeResult::Loss), T0, profit);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.recent(1)[0].asset, "unknown");
        assert_eq!(ledger.calculate_consecutive_losses(), 1);
    }

    #[test]
    fn test_consecutive_losses_skip_pending() {
        let mut ledger = TradeLedger::new(LedgerConfig::default());
        for (i, result) in [TradeResult::Loss, TradeResult::Win, TradeResult::Loss, TradeResult::Loss]
            .into_iter()
            .enumerate()
        {
            let id = format!("s{}", i);
            ledger.append(pending(&id, T0 + i as i64));
            ledger.settle(&TradeOutcome::for_signal(&id, result), T0, profit);
        }
        ledger.append(pending("open", T0 + 10));
        assert_eq!(ledger.calculate_consecutive_losses(), 2);
    }

    #[test]
    fn test_emergency_stop_auto_activates_once() {
        let mut ledger = TradeLedger::new(LedgerConfig::default());
        for i in 0..2 {
            ledger.settle(&TradeOutcome::for_signal(&format!("s{}", i), TradeResult::Loss), T0, profit);
            assert!(ledger.check_emergency(T0).is_none());
        }
        ledger.settle(&TradeOutcome::for_signal("s2", TradeResult::Loss), T0, profit);
        let event = ledger.check_emergency(T0 + 5).unwrap();
        assert_eq!(event.consecutive_losses, 3);
        assert_eq!(event.at, T0 + 5);
        assert!(ledger.is_emergency_active());
        assert!(ledger.check_emergency(T0 + 6).is_none());

        // 复位后连亏计数不清零，下一次检查会再次触发
        ledger.reset();
        assert!(!ledger.is_emergency_active());
        assert_eq!(ledger.calculate_consecutive_losses(), 3);
        assert!(ledger.check_emergency(T0 + 7).is_some());
    }

    #[test]
    fn test_capacity_and_stats() {
        let config = LedgerConfig {
            max_records: 3,
            ..LedgerConfig::default()
        };
        let mut ledger = TradeLedger::new(config.clone());
        for (i, result) in [TradeResult::Win, TradeResult::Win, TradeResult::Loss, TradeResult::Win]
            .into_iter()
            .enumerate()
        {
            let id = format!("s{}", i);
            ledger.append(pending(&id, T0));
            ledger.settle(&TradeOutcome::for_signal(&id, result), T0, profit);
        }
        assert_eq!(ledger.len(), 3);
        let stats = ledger.stats(local_date_of(T0));
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert!(approx_eq!(f64, stats.win_rate, 66.7, epsilon = 1e-9));
        assert!(approx_eq!(f64, stats.net_profit, 6.0, epsilon = 1e-9));
        assert_eq!(stats.trades_today, 3);

        let restored = TradeLedger::from_snapshot(config, ledger.snapshot());
        assert_eq!(restored.len(), 3);
    }
}
