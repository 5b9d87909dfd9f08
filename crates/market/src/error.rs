use thiserror::Error;

use sniper_common::Timeframe;

/// 数据源错误
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("response format error: {0}")]
    ResponseFormat(String),

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("{provider} does not support timeframe {timeframe}")]
    UnsupportedTimeframe { provider: String, timeframe: Timeframe },

    #[error("{provider} circuit breaker open")]
    CircuitOpen { provider: String },

    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("{provider} disabled: {reason}")]
    Disabled { provider: String, reason: String },

    #[error("no market data available for {symbol} {timeframe}")]
    NoData { symbol: String, timeframe: Timeframe },
}

impl MarketDataError {
    /// 是否计入熔断器的失败次数
    ///
    /// 配置类错误（不支持的周期、未启用）不是数据源故障
    pub fn counts_as_failure(&self) -> bool {
        !matches!(
            self,
            MarketDataError::UnsupportedTimeframe { .. }
                | MarketDataError::Disabled { .. }
                | MarketDataError::CircuitOpen { .. }
        )
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MarketDataError::ResponseFormat(e.to_string())
        } else {
            MarketDataError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for MarketDataError {
    fn from(e: serde_json::Error) -> Self {
        MarketDataError::ResponseFormat(e.to_string())
    }
}
