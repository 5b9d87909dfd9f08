//! OTC K线序列存储
//!
//! 外部抓取端推送的 `CandleBatch` 按时间戳合并进每个 (品种, 周期) 的有序序列，
//! 同一时间戳后到的覆盖先到的，只保留最近 `max_len` 根。

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sniper_common::{CandleItem, Symbol, Timeframe};

/// 抓取端推送的一批K线
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleBatch {
    pub asset: String,
    pub timeframe: String,
    pub candles: Vec<CandleItem>,
    #[serde(default)]
    pub broker: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: usize,
    pub series_len: usize,
}

#[derive(Debug)]
pub struct CandleSeriesStore {
    series: DashMap<(String, Timeframe), BTreeMap<i64, CandleItem>>,
    max_len: usize,
}

impl Default for CandleSeriesStore {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl CandleSeriesStore {
    pub fn new(max_len: usize) -> Self {
        Self {
            series: DashMap::new(),
            max_len: max_len.max(1),
        }
    }

    /// 合并一批K线，返回接受与丢弃的数量
    pub fn ingest(&self, batch: CandleBatch) -> IngestReport {
        let symbol = Symbol::parse(&batch.asset);
        let timeframe = Timeframe::parse_or_default(&batch.timeframe);
        self.merge(&symbol, timeframe, batch.candles, batch.broker.as_deref())
    }

    pub fn merge(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        candles: Vec<CandleItem>,
        broker: Option<&str>,
    ) -> IngestReport {
        let mut accepted = 0;
        let mut rejected = 0;
        let mut entry = self
            .series
            .entry((symbol.key(), timeframe))
            .or_default();
        for candle in candles {
            match candle.validate() {
                Ok(()) => {
                    entry.insert(candle.ts(), candle);
                    accepted += 1;
                }
                Err(e) => {
                    warn!("丢弃非法K线 symbol={} timeframe={} err={}", symbol, timeframe, e);
                    rejected += 1;
                }
            }
        }
        while entry.len() > self.max_len {
            entry.pop_first();
        }
        let series_len = entry.len();
        debug!(
            "K线入库 symbol={} timeframe={} broker={:?} accepted={} rejected={} len={}",
            symbol, timeframe, broker, accepted, rejected, series_len
        );
        IngestReport {
            accepted,
            rejected,
            series_len,
        }
    }

    /// 最近 `limit` 根K线，按时间升序
    pub fn latest(&self, symbol: &Symbol, timeframe: Timeframe, limit: usize) -> Vec<CandleItem> {
        match self.series.get(&(symbol.key(), timeframe)) {
            Some(series) => {
                let skip = series.len().saturating_sub(limit);
                series.values().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn len(&self, symbol: &Symbol, timeframe: Timeframe) -> usize {
        self.series
            .get(&(symbol.key(), timeframe))
            .map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, c: f64) -> CandleItem {
        CandleItem::builder().ts(ts).o(c).h(c + 0.001).l(c - 0.001).c(c).build().unwrap()
    }

    fn batch(asset: &str, candles: Vec<CandleItem>) -> CandleBatch {
        CandleBatch {
            asset: asset.to_string(),
            timeframe: "1m".to_string(),
            candles,
            broker: Some("pocket_option".to_string()),
        }
    }

    #[test]
    fn test_ingest_merges_by_timestamp() {
        let store = CandleSeriesStore::new(10);
        store.ingest(batch("EUR/USD OTC", vec![candle(1, 1.1), candle(2, 1.2)]));
        let report = store.ingest(batch("eur-usd (otc)", vec![candle(2, 1.25), candle(3, 1.3)]));
        assert_eq!(report.accepted, 2);
        assert_eq!(report.series_len, 3);

        let symbol = Symbol::parse("EURUSD OTC");
        let series = store.latest(&symbol, Timeframe::M1, 10);
        assert_eq!(series.iter().map(|c| c.ts()).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(series[1].c(), 1.25);
    }

    #[test]
    fn test_invalid_candles_dropped() {
        let store = CandleSeriesStore::new(10);
        let bad: CandleItem = serde_json::from_str(
            r#"{"open":1.2,"high":1.1,"low":1.0,"close":1.15,"timestamp":5}"#,
        )
        .unwrap();
        let report = store.ingest(batch("EURUSD", vec![candle(1, 1.1), bad]));
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, 1);
    }

    #[test]
    fn test_series_capped_keeps_most_recent() {
        let store = CandleSeriesStore::new(3);
        let candles = (0..5).map(|i| candle(i, 1.0 + i as f64 * 0.01)).collect();
        store.ingest(batch("GBPUSD", candles));
        let symbol = Symbol::parse("GBPUSD");
        let series = store.latest(&symbol, Timeframe::M1, 100);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].ts(), 2);
        assert_eq!(store.latest(&symbol, Timeframe::M1, 2)[0].ts(), 3);
    }
}
