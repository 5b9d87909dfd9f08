use async_trait::async_trait;

use sniper_common::{CandleItem, Symbol, Timeframe};

use crate::error::MarketDataError;

/// K线数据源
///
/// 返回按时间戳升序、无重复的K线；数据源自身不做缓存，缓存与回退由 [`crate::MarketDataChain`] 负责。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 数据源名称，与 `MARKET_PROVIDERS` 中的名字一致
    fn name(&self) -> &str;

    /// 是否能提供该品种，不支持的品种直接跳过且不计入熔断
    fn supports(&self, symbol: &Symbol) -> bool {
        let _ = symbol;
        true
    }

    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<CandleItem>, MarketDataError>;
}

/// 排序、按时间戳去重（后到的覆盖先到的）并丢弃不合法的K线
pub(crate) fn normalize_candles(mut candles: Vec<CandleItem>, limit: usize) -> Vec<CandleItem> {
    candles.retain(|c| c.validate().is_ok());
    candles.sort_by_key(|c| c.ts());
    let mut deduped: Vec<CandleItem> = Vec::with_capacity(candles.len());
    for candle in candles {
        match deduped.last_mut() {
            Some(last) if last.ts() == candle.ts() => *last = candle,
            _ => deduped.push(candle),
        }
    }
    let start = deduped.len().saturating_sub(limit);
    deduped.split_off(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, c: f64) -> CandleItem {
        CandleItem::builder().ts(ts).o(c).h(c + 0.1).l(c - 0.1).c(c).build().unwrap()
    }

    #[test]
    fn test_normalize_sorts_dedups_and_limits() {
        let candles = vec![candle(3, 1.3), candle(1, 1.1), candle(2, 1.2), candle(2, 1.25)];
        let out = normalize_candles(candles, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].ts(), 2);
        assert_eq!(out[0].c(), 1.25);
        assert_eq!(out[1].ts(), 3);
    }
}
