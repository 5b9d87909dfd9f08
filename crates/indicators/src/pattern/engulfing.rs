use sniper_common::CandleItem;

/// 吞没形态：当前实体完全包住前一根实体（边界可重合），且两根K线涨跌相反
#[derive(Debug, Clone, Default)]
pub struct KlineEngulfingIndicator;

#[derive(Debug, Clone, PartialEq)]
pub struct KlineEngulfingOutput {
    /// true 看涨吞没，false 看跌吞没
    pub is_bullish: bool,
    /// 当前实体 / 前一根实体
    pub body_ratio: f64,
}

impl KlineEngulfingIndicator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, last_kline: &CandleItem, current_kline: &CandleItem) -> Option<KlineEngulfingOutput> {
        let opposite = (last_kline.is_bearish() && current_kline.is_bullish())
            || (last_kline.is_bullish() && current_kline.is_bearish());
        if !opposite {
            return None;
        }

        let last_body = last_kline.body();
        let current_body = current_kline.body();
        let contains = current_kline.o().max(current_kline.c()) >= last_kline.o().max(last_kline.c())
            && current_kline.o().min(current_kline.c()) <= last_kline.o().min(last_kline.c());
        if !contains {
            return None;
        }

        Some(KlineEngulfingOutput {
            is_bullish: current_kline.is_bullish(),
            body_ratio: current_body / last_body,
        })
    }
}

//添加测试单例
#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, o: f64, h: f64, l: f64, c: f64) -> CandleItem {
        CandleItem::builder().ts(ts).o(o).h(h).l(l).c(c).build().unwrap()
    }

    #[test]
    fn test_engulfing_indicator() {
        let indicator = KlineEngulfingIndicator::new();

        // 看涨吞没
        let output = indicator
            .evaluate(&candle(0, 100.0, 110.0, 90.0, 95.0), &candle(1, 94.0, 105.0, 85.0, 102.0))
            .unwrap();
        assert!(output.is_bullish);
        assert!((output.body_ratio - 8.0 / 5.0).abs() < 1e-9);

        // 看跌吞没
        let output = indicator
            .evaluate(&candle(2, 100.0, 110.0, 90.0, 105.0), &candle(3, 106.0, 115.0, 95.0, 98.0))
            .unwrap();
        assert!(!output.is_bullish);

        // 同向K线不是吞没
        assert!(indicator
            .evaluate(&candle(4, 100.0, 110.0, 90.0, 105.0), &candle(5, 104.0, 115.0, 95.0, 110.0))
            .is_none());

        // 实体等长且边界重合也算包住
        let output = indicator
            .evaluate(&candle(6, 100.0, 101.0, 94.0, 95.0), &candle(7, 95.0, 101.0, 94.0, 100.0))
            .unwrap();
        assert!(output.is_bullish);
        assert!((output.body_ratio - 1.0).abs() < 1e-9);

        // 实体未完全包住
        assert!(indicator
            .evaluate(&candle(8, 100.0, 110.0, 90.0, 95.0), &candle(9, 96.0, 105.0, 85.0, 102.0))
            .is_none());
    }
}
