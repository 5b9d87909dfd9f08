//! 聚合配置：每个 crate 自己的配置段，在这里统一从环境变量读取

use serde::{Deserialize, Serialize};
use tracing::warn;

use sniper_ai_analysis::LlmConfig;
use sniper_common::{EnumAsStrTrait, Symbol, Timeframe};
use sniper_core::config::{env_i64, env_or_default, env_usize};
use sniper_indicators::IndicatorPeriods;
use sniper_infrastructure::StateBackend;
use sniper_market::MarketConfig;
use sniper_risk::{DisciplineConfig, LedgerConfig, RiskConfig};
use sniper_strategies::ConsensusConfig;

/// 信号缓存与历史
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub cache_ttl_ms: i64,
    /// 信号有效期
    pub expiry_ms: i64,
    pub history_limit: usize,
    /// 单次通知的超时
    pub notify_timeout_ms: i64,
    /// 参与多周期一致性统计的周期
    pub agreement_timeframes: Vec<Timeframe>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 300_000,
            expiry_ms: 300_000,
            history_limit: 500,
            notify_timeout_ms: 5_000,
            agreement_timeframes: vec![Timeframe::M1, Timeframe::M5, Timeframe::M15],
        }
    }
}

impl SignalConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            cache_ttl_ms: env_i64("SIGNAL_CACHE_TTL_MS", d.cache_ttl_ms).max(0),
            expiry_ms: env_i64("SIGNAL_EXPIRY_MS", d.expiry_ms).max(0),
            history_limit: env_usize("SIGNAL_HISTORY_LIMIT", d.history_limit).max(1),
            notify_timeout_ms: env_i64("NOTIFY_TIMEOUT_MS", d.notify_timeout_ms).max(1),
            agreement_timeframes: match std::env::var("AGREEMENT_TIMEFRAMES") {
                Ok(raw) => parse_timeframes(&raw),
                Err(_) => d.agreement_timeframes,
            },
        }
    }
}

/// 解析 `1m,5m,15m`，未知周期跳过，重复的只保留一次
pub fn parse_timeframes(raw: &str) -> Vec<Timeframe> {
    let mut timeframes = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match Timeframe::parse(item) {
            Some(tf) if !timeframes.contains(&tf) => timeframes.push(tf),
            Some(_) => {}
            None => warn!("忽略未知周期 `{}`", item),
        }
    }
    timeframes
}

/// 定时任务的目标 (品种, 周期)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalTarget {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
}

impl SignalTarget {
    pub fn new(symbol: Symbol, timeframe: Timeframe) -> Self {
        Self { symbol, timeframe }
    }
}

impl std::fmt::Display for SignalTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.symbol, self.timeframe.as_str())
    }
}

/// 解析 `EURUSD:5m,GBPUSD OTC:1m`，无法识别的周期跳过
pub fn parse_targets(raw: &str) -> Vec<SignalTarget> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|item| {
            let (symbol, tf) = match item.rsplit_once(':') {
                Some((symbol, tf)) => (symbol, tf),
                None => (item, "5m"),
            };
            let symbol = Symbol::parse(symbol);
            if symbol.pair.is_empty() {
                warn!("忽略无效目标 `{}`", item);
                return None;
            }
            match Timeframe::parse(tf) {
                Some(timeframe) => Some(SignalTarget::new(symbol, timeframe)),
                None => {
                    warn!("忽略无效目标 `{}`：未知周期", item);
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct SniperConfig {
    pub market: MarketConfig,
    pub indicators: IndicatorPeriods,
    pub consensus: ConsensusConfig,
    pub llm: LlmConfig,
    pub discipline: DisciplineConfig,
    pub risk: RiskConfig,
    pub ledger: LedgerConfig,
    pub signal: SignalConfig,
    pub state_backend: StateBackend,
    pub targets: Vec<SignalTarget>,
    pub job_interval_ms: u64,
}

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            market: MarketConfig::default(),
            indicators: IndicatorPeriods::default(),
            consensus: ConsensusConfig::default(),
            llm: LlmConfig::default(),
            discipline: DisciplineConfig::default(),
            risk: RiskConfig::default(),
            ledger: LedgerConfig::default(),
            signal: SignalConfig::default(),
            state_backend: StateBackend::Memory,
            targets: parse_targets("EURUSD:5m"),
            job_interval_ms: 60_000,
        }
    }
}

impl SniperConfig {
    pub fn from_env() -> Self {
        Self {
            market: MarketConfig::from_env(),
            indicators: IndicatorPeriods::from_env(),
            consensus: ConsensusConfig::from_env(),
            llm: LlmConfig::from_env(),
            discipline: DisciplineConfig::from_env(),
            risk: RiskConfig::from_env(),
            ledger: LedgerConfig::from_env(),
            signal: SignalConfig::from_env(),
            state_backend: StateBackend::from_env(),
            targets: parse_targets(&env_or_default("SNIPER_TARGETS", "EURUSD:5m")),
            job_interval_ms: env_i64("SIGNAL_JOB_INTERVAL_MS", 60_000).max(1_000) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets() {
        let targets = parse_targets("EURUSD:5m, GBPUSD OTC:1m,,USDJPY:7m,AUDCAD");
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].symbol.key(), "EURUSD");
        assert_eq!(targets[0].timeframe, Timeframe::M5);
        assert!(targets[1].symbol.otc);
        assert_eq!(targets[1].timeframe, Timeframe::M1);
        assert_eq!(targets[2].to_string(), "AUDCAD:5m");
    }

    #[test]
    fn test_defaults() {
        let config = SniperConfig::default();
        assert_eq!(config.signal.cache_ttl_ms, 300_000);
        assert_eq!(config.signal.history_limit, 500);
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.state_backend, StateBackend::Memory);
        assert_eq!(
            config.signal.agreement_timeframes,
            vec![Timeframe::M1, Timeframe::M5, Timeframe::M15]
        );
    }

    #[test]
    fn test_parse_timeframes() {
        assert_eq!(
            parse_timeframes("5m, 1h,7m,5min,,15m"),
            vec![Timeframe::M5, Timeframe::H1, Timeframe::M15]
        );
        assert!(parse_timeframes("").is_empty());
    }
}
