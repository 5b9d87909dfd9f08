use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use sniper_common::{CandleItem, Symbol, Timeframe};

use crate::error::MarketDataError;
use crate::provider::{normalize_candles, MarketDataProvider};

use super::http_client;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance chart API，外汇品种使用 `EURUSD=X`
#[derive(Debug, Clone)]
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub const NAME: &'static str = "yahoo";

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

    /// Yahoo 不支持 3m 与 4h
    pub fn interval(timeframe: Timeframe) -> Option<&'static str> {
        match timeframe {
            Timeframe::M1 => Some("1m"),
            Timeframe::M5 => Some("5m"),
            Timeframe::M15 => Some("15m"),
            Timeframe::M30 => Some("30m"),
            Timeframe::H1 => Some("60m"),
            Timeframe::D1 => Some("1d"),
            Timeframe::M3 | Timeframe::H4 => None,
        }
    }

    /// 分钟级数据 Yahoo 只保留有限天数
    fn range(timeframe: Timeframe) -> &'static str {
        match timeframe {
            Timeframe::M1 => "1d",
            Timeframe::M3 | Timeframe::M5 | Timeframe::M15 | Timeframe::M30 => "5d",
            Timeframe::H1 | Timeframe::H4 => "1mo",
            Timeframe::D1 => "1y",
        }
    }

    pub fn market_symbol(symbol: &Symbol) -> String {
        if symbol.fx_legs().is_some() {
            format!("{}=X", symbol.pair)
        } else {
            symbol.pair.clone()
        }
    }

    pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<CandleItem>, MarketDataError> {
        let resp: ChartResponse = serde_json::from_str(body)?;
        let result = match resp.chart.result {
            Some(result) => result,
            None => {
                return Err(match resp.chart.error {
                    Some(err) if err.code == "Not Found" => {
                        MarketDataError::SymbolNotFound(symbol.to_string())
                    }
                    Some(err) => MarketDataError::ResponseFormat(format!(
                        "{}: {}",
                        err.code, err.description
                    )),
                    None => MarketDataError::ResponseFormat("empty result with no error".into()),
                })
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::ResponseFormat("result array is empty".into()))?;
        let timestamps = data.timestamp.unwrap_or_default();
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::ResponseFormat("no quote data".into()))?;

        let mut candles = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let value = |series: &Vec<Option<f64>>| series.get(i).copied().flatten();
            // 休市或未成交的K线四个价格都可能为空，整根跳过
            let (o, h, l, c) = match (
                value(&quote.open),
                value(&quote.high),
                value(&quote.low),
                value(&quote.close),
            ) {
                (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
                _ => continue,
            };
            let built = CandleItem::builder()
                .ts(ts * 1000)
                .o(o)
                .h(h)
                .l(l)
                .c(c)
                .v(value(&quote.volume).unwrap_or(0.0).max(0.0))
                .build();
            if let Ok(candle) = built {
                candles.push(candle);
            }
        }
        Ok(candles)
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
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
        let interval = Self::interval(timeframe).ok_or(MarketDataError::UnsupportedTimeframe {
            provider: Self::NAME.to_string(),
            timeframe,
        })?;
        let market_symbol = Self::market_symbol(symbol);
        let url = format!("{}/{}", self.base_url, market_symbol);
        let response = self
            .client
            .get(&url)
            .query(&[("interval", interval), ("range", Self::range(timeframe))])
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => {
                return Err(MarketDataError::RateLimited {
                    provider: Self::NAME.to_string(),
                })
            }
            StatusCode::NOT_FOUND => return Err(MarketDataError::SymbolNotFound(market_symbol)),
            status if !status.is_success() => {
                return Err(MarketDataError::Network(format!("HTTP {}", status)))
            }
            _ => {}
        }

        let body = response.text().await?;
        let candles = Self::parse_chart(&market_symbol, &body)?;
        debug!("Yahoo 返回 {} 根K线 symbol={}", candles.len(), market_symbol);
        Ok(normalize_candles(candles, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_skips_null_rows() {
        let body = r#"{"chart":{"result":[{"timestamp":[1700000000,1700000300,1700000600],
            "indicators":{"quote":[{"open":[1.08,null,1.081],"high":[1.082,null,1.083],
            "low":[1.079,null,1.080],"close":[1.081,null,1.082],"volume":[0,null,0]}]}}],"error":null}}"#;
        let candles = YahooProvider::parse_chart("EURUSD=X", body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].ts(), 1_700_000_000_000);
        assert_eq!(candles[1].c(), 1.082);
    }

    #[test]
    fn test_parse_chart_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        assert!(matches!(
            YahooProvider::parse_chart("XXX=X", body),
            Err(MarketDataError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn test_symbol_and_interval_mapping() {
        assert_eq!(YahooProvider::market_symbol(&Symbol::parse("EUR/USD")), "EURUSD=X");
        assert_eq!(YahooProvider::interval(Timeframe::H1), Some("60m"));
        assert_eq!(YahooProvider::interval(Timeframe::H4), None);
    }
}
