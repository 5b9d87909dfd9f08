//! 回退链集成测试：缓存命中、回退、过期缓存、无数据、熔断

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sniper_common::{CandleItem, ManualClock, Symbol, Timeframe};
use sniper_market::{
    CandleBatch, CandleSeriesStore, MarketConfig, MarketDataChain, MarketDataError,
    MarketDataProvider, OtcFeedProvider,
};

struct ScriptedProvider {
    name: &'static str,
    healthy: AtomicBool,
    slow: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(name: &'static str, healthy: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            healthy: AtomicBool::new(healthy),
            slow: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            healthy: AtomicBool::new(true),
            slow: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_candles(
        &self,
        _symbol: &Symbol,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<CandleItem>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.slow {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(MarketDataError::Network("connection refused".into()));
        }
        Ok(candles(limit.min(30)))
    }
}

fn candles(n: usize) -> Vec<CandleItem> {
    (0..n)
        .map(|i| {
            let c = 1.08 + i as f64 * 0.0001;
            CandleItem::builder()
                .ts(i as i64 * 60_000)
                .o(c)
                .h(c + 0.0002)
                .l(c - 0.0002)
                .c(c)
                .build()
                .unwrap()
        })
        .collect()
}

fn erased(provider: &Arc<ScriptedProvider>) -> Arc<dyn MarketDataProvider> {
    provider.clone()
}

fn config() -> MarketConfig {
    MarketConfig {
        provider_timeout_ms: 100,
        cache_ttl_ms: 300_000,
        ..MarketConfig::default()
    }
}

fn chain(providers: Vec<Arc<dyn MarketDataProvider>>, clock: Arc<ManualClock>) -> MarketDataChain {
    MarketDataChain::new(providers, &config(), clock)
}

#[tokio::test]
async fn fresh_cache_hit_skips_providers() {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let primary = ScriptedProvider::new("primary", true);
    let chain = chain(vec![erased(&primary)], clock.clone());
    let symbol = Symbol::parse("EUR/USD");

    let first = chain.fetch(&symbol, Timeframe::M5).await.unwrap();
    clock.advance(60_000);
    let second = chain.fetch(&symbol, Timeframe::M5).await.unwrap();

    assert_eq!(primary.calls(), 1);
    assert_eq!(first, second);
    assert!(!second.stale);
    assert_eq!(second.source, "primary");
}

#[tokio::test]
async fn falls_through_to_next_provider() {
    let clock = Arc::new(ManualClock::new(0));
    let broken = ScriptedProvider::new("broken", false);
    let backup = ScriptedProvider::new("backup", true);
    let chain = chain(vec![erased(&broken), erased(&backup)], clock);

    let data = chain.fetch(&Symbol::parse("GBPUSD"), Timeframe::M1).await.unwrap();
    assert_eq!(data.source, "backup");
    assert_eq!(broken.calls(), 1);
    assert!(!data.candles.is_empty());
}

#[tokio::test]
async fn timeout_falls_through() {
    let clock = Arc::new(ManualClock::new(0));
    let slow = ScriptedProvider::slow("slow");
    let backup = ScriptedProvider::new("backup", true);
    let chain = chain(vec![erased(&slow), erased(&backup)], clock);

    let data = chain.fetch(&Symbol::parse("USDJPY"), Timeframe::M5).await.unwrap();
    assert_eq!(data.source, "backup");
}

#[tokio::test]
async fn all_failing_returns_stale_cache() {
    let clock = Arc::new(ManualClock::new(0));
    let provider = ScriptedProvider::new("only", true);
    let chain = chain(vec![erased(&provider)], clock.clone());
    let symbol = Symbol::parse("EURUSD");

    let fresh = chain.fetch(&symbol, Timeframe::M5).await.unwrap();
    assert!(!fresh.stale);

    provider.healthy.store(false, Ordering::SeqCst);
    clock.advance(600_000);
    let stale = chain.fetch(&symbol, Timeframe::M5).await.unwrap();
    assert!(stale.stale);
    assert_eq!(stale.candles, fresh.candles);
    assert_eq!(stale.fetched_at, fresh.fetched_at);
}

#[tokio::test]
async fn no_cache_and_no_provider_is_no_data() {
    let clock = Arc::new(ManualClock::new(0));
    let chain = chain(vec![erased(&ScriptedProvider::new("down", false))], clock);
    let err = chain
        .fetch(&Symbol::parse("AUDCAD"), Timeframe::M15)
        .await
        .unwrap_err();
    assert!(matches!(err, MarketDataError::NoData { timeframe: Timeframe::M15, .. }));
}

#[tokio::test]
async fn circuit_breaker_skips_failing_provider() {
    let clock = Arc::new(ManualClock::new(0));
    let broken = ScriptedProvider::new("broken", false);
    let chain = chain(vec![erased(&broken)], clock);
    let symbol = Symbol::parse("EURGBP");

    for _ in 0..5 {
        let _ = chain.fetch(&symbol, Timeframe::M5).await;
    }
    // 第 3 次失败后熔断，之后不再调用
    assert_eq!(broken.calls(), 3);
}

#[tokio::test]
async fn otc_feed_serves_ingested_series() {
    let clock = Arc::new(ManualClock::new(0));
    let store = Arc::new(CandleSeriesStore::new(1_000));
    let otc: Arc<dyn MarketDataProvider> = Arc::new(OtcFeedProvider::new(store.clone()));
    let fallback = ScriptedProvider::new("fallback", true);
    let chain = chain(vec![otc, erased(&fallback)], clock);
    let symbol = Symbol::parse("EUR/USD OTC");

    store.ingest(CandleBatch {
        asset: "EUR/USD OTC".into(),
        timeframe: "1m".into(),
        candles: candles(20),
        broker: None,
    });
    let data = chain.fetch(&symbol, Timeframe::M1).await.unwrap();
    assert_eq!(data.source, "otc_feed");
    assert_eq!(data.candles.len(), 20);
    assert_eq!(fallback.calls(), 0);

    store.ingest(CandleBatch {
        asset: "EURUSD OTC".into(),
        timeframe: "1m".into(),
        candles: candles(25),
        broker: None,
    });
    chain.invalidate(&symbol, Timeframe::M1);
    let refreshed = chain.fetch(&symbol, Timeframe::M1).await.unwrap();
    assert_eq!(refreshed.candles.len(), 25);
}
