use std::time::Duration;

use sniper_core::config::{env_i64, env_list, env_opt, env_u32, env_usize};

/// 市场数据配置
#[derive(Debug, Clone, PartialEq)]
pub struct MarketConfig {
    /// 数据源优先级
    pub providers: Vec<String>,
    pub provider_timeout_ms: u64,
    /// 行情缓存新鲜期
    pub cache_ttl_ms: i64,
    pub breaker_failure_threshold: u32,
    pub breaker_cooldown_ms: u64,
    /// 每个 (品种, 周期) 保留的最大K线数
    pub max_series_len: usize,
    /// 每次请求的K线数量
    pub fetch_limit: usize,
    pub alpha_vantage_api_key: Option<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                "otc_feed".to_string(),
                "binance".to_string(),
                "yahoo".to_string(),
                "alpha_vantage".to_string(),
            ],
            provider_timeout_ms: 8_000,
            cache_ttl_ms: 300_000,
            breaker_failure_threshold: 3,
            breaker_cooldown_ms: 60_000,
            max_series_len: 1_000,
            fetch_limit: 200,
            alpha_vantage_api_key: None,
        }
    }
}

impl MarketConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            providers: env_list("MARKET_PROVIDERS", &d.providers.join(",")),
            provider_timeout_ms: env_i64("PROVIDER_TIMEOUT_MS", d.provider_timeout_ms as i64).max(1)
                as u64,
            cache_ttl_ms: env_i64("MARKET_CACHE_TTL_MS", d.cache_ttl_ms).max(0),
            breaker_failure_threshold: env_u32(
                "BREAKER_FAILURE_THRESHOLD",
                d.breaker_failure_threshold,
            ),
            breaker_cooldown_ms: env_i64("BREAKER_COOLDOWN_MS", d.breaker_cooldown_ms as i64).max(0)
                as u64,
            max_series_len: env_usize("MAX_SERIES_LEN", d.max_series_len).max(1),
            fetch_limit: env_usize("MARKET_FETCH_LIMIT", d.fetch_limit).max(1),
            alpha_vantage_api_key: env_opt("ALPHA_VANTAGE_API_KEY").filter(|k| k != "demo"),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_millis(self.breaker_cooldown_ms)
    }
}
