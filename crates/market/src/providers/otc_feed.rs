use std::sync::Arc;

use async_trait::async_trait;

use sniper_common::{CandleItem, Symbol, Timeframe};

use crate::error::MarketDataError;
use crate::provider::MarketDataProvider;
use crate::series_store::CandleSeriesStore;

/// 读取进程内由抓取端推送的K线序列
#[derive(Debug, Clone)]
pub struct OtcFeedProvider {
    store: Arc<CandleSeriesStore>,
}

impl OtcFeedProvider {
    pub const NAME: &'static str = "otc_feed";

    pub fn new(store: Arc<CandleSeriesStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MarketDataProvider for OtcFeedProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<CandleItem>, MarketDataError> {
        Ok(self.store.latest(symbol, timeframe, limit))
    }
}
