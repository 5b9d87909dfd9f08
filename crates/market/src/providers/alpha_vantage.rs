use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use sniper_common::{CandleItem, Symbol, Timeframe};

use crate::error::MarketDataError;
use crate::provider::{normalize_candles, MarketDataProvider};

use super::http_client;

const BASE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Deserialize)]
struct FxBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
}

/// Alpha Vantage FX_INTRADAY，没有 API Key 时禁用
#[derive(Debug, Clone)]
pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AlphaVantageProvider {
    pub const NAME: &'static str = "alpha_vantage";

    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: BASE_URL.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// 日内接口只支持到 60min
    pub fn interval(timeframe: Timeframe) -> Option<&'static str> {
        match timeframe {
            Timeframe::M1 => Some("1min"),
            Timeframe::M5 => Some("5min"),
            Timeframe::M15 => Some("15min"),
            Timeframe::M30 => Some("30min"),
            Timeframe::H1 => Some("60min"),
            Timeframe::M3 | Timeframe::H4 | Timeframe::D1 => None,
        }
    }

    /// 解析 `Time Series FX (<interval>)`，时间为 UTC；外汇没有成交量
    pub fn parse_series(body: &str, interval: &str) -> Result<Vec<CandleItem>, MarketDataError> {
        let root: Value = serde_json::from_str(body)?;
        if root.get("Note").is_some() || root.get("Information").is_some() {
            return Err(MarketDataError::RateLimited {
                provider: Self::NAME.to_string(),
            });
        }
        if let Some(msg) = root.get("Error Message").and_then(Value::as_str) {
            return Err(MarketDataError::SymbolNotFound(msg.to_string()));
        }

        let key = format!("Time Series FX ({})", interval);
        let series = root
            .get(&key)
            .cloned()
            .ok_or_else(|| MarketDataError::ResponseFormat(format!("missing `{}`", key)))?;
        let bars: BTreeMap<String, FxBar> = serde_json::from_value(series)?;

        let price = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|e| MarketDataError::ResponseFormat(format!("bad price `{}`: {}", s, e)))
        };
        let mut candles = Vec::with_capacity(bars.len());
        for (stamp, bar) in bars {
            let ts = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S")
                .map_err(|e| MarketDataError::ResponseFormat(format!("bad time `{}`: {}", stamp, e)))?
                .and_utc()
                .timestamp_millis();
            let built = CandleItem::builder()
                .ts(ts)
                .o(price(&bar.open)?)
                .h(price(&bar.high)?)
                .l(price(&bar.low)?)
                .c(price(&bar.close)?)
                .v(0.0)
                .build();
            if let Ok(candle) = built {
                candles.push(candle);
            }
        }
        Ok(candles)
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports(&self, symbol: &Symbol) -> bool {
        !symbol.otc && symbol.fx_legs().is_some()
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<CandleItem>, MarketDataError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| MarketDataError::Disabled {
            provider: Self::NAME.to_string(),
            reason: "ALPHA_VANTAGE_API_KEY not set".to_string(),
        })?;
        let interval = Self::interval(timeframe).ok_or(MarketDataError::UnsupportedTimeframe {
            provider: Self::NAME.to_string(),
            timeframe,
        })?;
        let (from, to) = symbol
            .fx_legs()
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.key()))?;
        let output_size = if limit > 100 { "full" } else { "compact" };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "FX_INTRADAY"),
                ("from_symbol", from),
                ("to_symbol", to),
                ("interval", interval),
                ("outputsize", output_size),
                ("apikey", api_key),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::Network(format!("HTTP {}", status)));
        }

        let body = response.text().await?;
        let candles = Self::parse_series(&body, interval)?;
        debug!("Alpha Vantage 返回 {} 根K线 pair={}", candles.len(), symbol.pair);
        Ok(normalize_candles(candles, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_series() {
        let body = r#"{
            "Meta Data": {"1. Information": "FX Intraday (5min) Time Series"},
            "Time Series FX (5min)": {
                "2024-01-02 10:05:00": {"1. open": "1.0950", "2. high": "1.0960", "3. low": "1.0945", "4. close": "1.0955"},
                "2024-01-02 10:00:00": {"1. open": "1.0940", "2. high": "1.0952", "3. low": "1.0938", "4. close": "1.0950"}
            }
        }"#;
        let candles = AlphaVantageProvider::parse_series(body, "5min").unwrap();
        let candles = normalize_candles(candles, 10);
        assert_eq!(candles.len(), 2);
        assert!(candles[0].ts() < candles[1].ts());
        assert_eq!(candles[1].c(), 1.0955);
        assert_eq!(candles[0].v(), 0.0);
    }

    #[test]
    fn test_rate_limit_note() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"}"#;
        assert!(matches!(
            AlphaVantageProvider::parse_series(body, "5min"),
            Err(MarketDataError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_disabled_without_key() {
        let provider = AlphaVantageProvider::new(None, Duration::from_secs(1));
        assert!(!provider.is_enabled());
        let err = provider
            .fetch_candles(&Symbol::parse("EURUSD"), Timeframe::M5, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketDataError::Disabled { .. }));
        assert!(!err.counts_as_failure());
    }
}
