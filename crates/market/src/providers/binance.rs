use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use sniper_common::{CandleItem, Symbol, Timeframe};

use crate::error::MarketDataError;
use crate::provider::{normalize_candles, MarketDataProvider};

use super::http_client;

const BASE_URL: &str = "https://api.binance.com/api/v3/klines";

/// Binance 现货K线，外汇对映射到 USDT 报价
#[derive(Debug, Clone)]
pub struct BinanceProvider {
    client: Client,
    base_url: String,
}

impl BinanceProvider {
    pub const NAME: &'static str = "binance";

    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn interval(timeframe: Timeframe) -> &'static str {
        match timeframe {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// `EURUSD` -> `EURUSDT`，`BTCUSDT` 保持不变
    pub fn market_symbol(symbol: &Symbol) -> String {
        if symbol.pair.ends_with("USDT") {
            symbol.pair.clone()
        } else if symbol.pair.ends_with("USD") {
            format!("{}T", symbol.pair)
        } else {
            symbol.pair.clone()
        }
    }

    /// 解析 klines 数组：`[openTime, "open", "high", "low", "close", "volume", ...]`
    pub fn parse_klines(body: &str) -> Result<Vec<CandleItem>, MarketDataError> {
        let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
        rows.iter()
            .map(|row| {
                let ts = row
                    .first()
                    .and_then(Value::as_i64)
                    .ok_or_else(|| MarketDataError::ResponseFormat("missing open time".into()))?;
                let field = |i: usize| -> Result<f64, MarketDataError> {
                    row.get(i)
                        .and_then(|v| match v {
                            Value::String(s) => s.parse::<f64>().ok(),
                            Value::Number(n) => n.as_f64(),
                            _ => None,
                        })
                        .ok_or_else(|| MarketDataError::ResponseFormat(format!("bad kline field {}", i)))
                };
                CandleItem::builder()
                    .ts(ts)
                    .o(field(1)?)
                    .h(field(2)?)
                    .l(field(3)?)
                    .c(field(4)?)
                    .v(field(5)?)
                    .build()
                    .map_err(|e| MarketDataError::ResponseFormat(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl MarketDataProvider for BinanceProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports(&self, symbol: &Symbol) -> bool {
        !symbol.otc
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<CandleItem>, MarketDataError> {
        let market_symbol = Self::market_symbol(symbol);
        let limit = limit.clamp(1, 1000).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("symbol", market_symbol.as_str()),
                ("interval", Self::interval(timeframe)),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::IM_A_TEAPOT => {
                return Err(MarketDataError::RateLimited {
                    provider: Self::NAME.to_string(),
                })
            }
            StatusCode::BAD_REQUEST => return Err(MarketDataError::SymbolNotFound(market_symbol)),
            status if !status.is_success() => {
                return Err(MarketDataError::Network(format!("HTTP {}", status)))
            }
            _ => {}
        }

        let body = response.text().await?;
        let candles = Self::parse_klines(&body)?;
        debug!("Binance 返回 {} 根K线 symbol={}", candles.len(), market_symbol);
        Ok(normalize_candles(candles, usize::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_klines() {
        let body = r#"[
            [1700000000000, "1.0850", "1.0860", "1.0840", "1.0855", "120.5", 1700000059999, "0", 10, "0", "0", "0"],
            [1700000060000, "1.0855", "1.0870", "1.0850", "1.0865", "98.0", 1700000119999, "0", 8, "0", "0", "0"]
        ]"#;
        let candles = BinanceProvider::parse_klines(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].ts(), 1_700_000_000_000);
        assert_eq!(candles[1].c(), 1.0865);
        assert_eq!(candles[0].v(), 120.5);
    }

    #[test]
    fn test_parse_klines_rejects_garbage() {
        assert!(BinanceProvider::parse_klines(r#"{"code":-1121,"msg":"Invalid symbol."}"#).is_err());
        assert!(BinanceProvider::parse_klines(r#"[[1, "x"]]"#).is_err());
    }

    #[test]
    fn test_symbol_and_interval_mapping() {
        assert_eq!(BinanceProvider::market_symbol(&Symbol::parse("EUR/USD")), "EURUSDT");
        assert_eq!(BinanceProvider::market_symbol(&Symbol::parse("BTCUSDT")), "BTCUSDT");
        assert_eq!(BinanceProvider::interval(Timeframe::H1), "1h");
        let provider = BinanceProvider::new(Duration::from_secs(1));
        assert!(!provider.supports(&Symbol::parse("EURUSD OTC")));
    }
}
