//! 多数据源回退链
//!
//! 1. 缓存新鲜直接返回
//! 2. 按优先级依次尝试数据源，每次调用单独超时，熔断中的数据源跳过
//! 3. 全部失败时返回过期缓存并标记 `stale`
//! 4. 没有任何缓存才返回 `NoData`

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use sniper_common::{CandleItem, Clock, Symbol, Timeframe};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::MarketConfig;
use crate::error::MarketDataError;
use crate::provider::MarketDataProvider;
use crate::providers::{AlphaVantageProvider, BinanceProvider, OtcFeedProvider, YahooProvider};
use crate::series_store::CandleSeriesStore;

/// 一次取数的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketData {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub candles: Vec<CandleItem>,
    /// 实际提供数据的数据源
    pub source: String,
    /// 全部数据源失败后回退到过期缓存
    pub stale: bool,
    pub fetched_at: i64,
}

struct ProviderSlot {
    provider: Arc<dyn MarketDataProvider>,
    breaker: CircuitBreaker,
}

pub struct MarketDataChain {
    slots: Vec<ProviderSlot>,
    cache: DashMap<(String, Timeframe), MarketData>,
    clock: Arc<dyn Clock>,
    cache_ttl_ms: i64,
    provider_timeout: Duration,
    fetch_limit: usize,
}

impl MarketDataChain {
    pub fn new(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        config: &MarketConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let slots = providers
            .into_iter()
            .map(|provider| ProviderSlot {
                provider,
                breaker: CircuitBreaker::new(
                    config.breaker_failure_threshold,
                    config.breaker_cooldown(),
                ),
            })
            .collect();
        Self {
            slots,
            cache: DashMap::new(),
            clock,
            cache_ttl_ms: config.cache_ttl_ms,
            provider_timeout: config.provider_timeout(),
            fetch_limit: config.fetch_limit,
        }
    }

    /// 按 `config.providers` 的顺序装配内置数据源，未知名字忽略
    pub fn from_config(
        config: &MarketConfig,
        store: Arc<CandleSeriesStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let timeout = config.provider_timeout();
        let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();
        for name in &config.providers {
            match name.as_str() {
                OtcFeedProvider::NAME => providers.push(Arc::new(OtcFeedProvider::new(store.clone()))),
                BinanceProvider::NAME => providers.push(Arc::new(BinanceProvider::new(timeout))),
                YahooProvider::NAME => providers.push(Arc::new(YahooProvider::new(timeout))),
                AlphaVantageProvider::NAME => {
                    let provider =
                        AlphaVantageProvider::new(config.alpha_vantage_api_key.clone(), timeout);
                    if provider.is_enabled() {
                        providers.push(Arc::new(provider));
                    } else {
                        info!("未配置 ALPHA_VANTAGE_API_KEY，跳过 alpha_vantage 数据源");
                    }
                }
                other => warn!("未知数据源 `{}`，已忽略", other),
            }
        }
        Self::new(providers, config, clock)
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.slots
            .iter()
            .map(|s| s.provider.name().to_string())
            .collect()
    }

    pub async fn fetch(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> Result<MarketData, MarketDataError> {
        self.fetch_with_limit(symbol, timeframe, self.fetch_limit).await
    }

    pub async fn fetch_with_limit(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<MarketData, MarketDataError> {
        let key = (symbol.key(), timeframe);
        let now = self.clock.now_ms();

        if let Some(cached) = self.cache.get(&key) {
            if now - cached.fetched_at < self.cache_ttl_ms {
                debug!("行情缓存命中 {} {} source={}", symbol, timeframe, cached.source);
                return Ok(cached.value().clone());
            }
        }

        for slot in &self.slots {
            let name = slot.provider.name();
            if !slot.provider.supports(symbol) {
                continue;
            }
            if !slot.breaker.is_allowed() {
                debug!(
                    "{} 熔断中，剩余 {:?}，跳过",
                    name,
                    slot.breaker.remaining_cooldown()
                );
                continue;
            }

            let call = slot.provider.fetch_candles(symbol, timeframe, limit);
            let result = match tokio::time::timeout(self.provider_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(MarketDataError::Timeout {
                    provider: name.to_string(),
                    timeout_ms: self.provider_timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(candles) if !candles.is_empty() => {
                    slot.breaker.record_success();
                    let data = MarketData {
                        symbol: symbol.clone(),
                        timeframe,
                        candles,
                        source: name.to_string(),
                        stale: false,
                        fetched_at: self.clock.now_ms(),
                    };
                    self.cache.insert(key.clone(), data.clone());
                    debug!(
                        "{} 提供 {} 根K线 {} {}",
                        name,
                        data.candles.len(),
                        symbol,
                        timeframe
                    );
                    return Ok(data);
                }
                Ok(_) => {
                    // 空结果不算故障，OTC 序列可能尚未推送
                    debug!("{} 没有 {} {} 的数据", name, symbol, timeframe);
                }
                Err(e) => {
                    if let MarketDataError::RateLimited { .. } = e {
                        slot.breaker.trip();
                    } else if e.counts_as_failure() {
                        slot.breaker.record_failure();
                    }
                    warn!("数据源 {} 失败 {} {}: {}", name, symbol, timeframe, e);
                }
            }
        }

        match self.cache.get(&key) {
            Some(cached) => {
                warn!(
                    "全部数据源失败，使用过期缓存 {} {} age={}ms",
                    symbol,
                    timeframe,
                    now - cached.fetched_at
                );
                let mut data = cached.value().clone();
                data.stale = true;
                Ok(data)
            }
            None => Err(MarketDataError::NoData {
                symbol: symbol.key(),
                timeframe,
            }),
        }
    }

    /// 新K线推送后让缓存失效，下一次取数直接读序列
    pub fn invalidate(&self, symbol: &Symbol, timeframe: Timeframe) {
        self.cache.remove(&(symbol.key(), timeframe));
    }

    pub fn cached(&self, symbol: &Symbol, timeframe: Timeframe) -> Option<MarketData> {
        self.cache.get(&(symbol.key(), timeframe)).map(|d| d.value().clone())
    }
}
