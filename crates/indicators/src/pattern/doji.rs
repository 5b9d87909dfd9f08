use sniper_common::CandleItem;

/// 十字星：实体不足振幅的 10%
#[derive(Debug, Clone)]
pub struct KlineDojiIndicator {
    max_body_ratio: f64,
}

impl Default for KlineDojiIndicator {
    fn default() -> Self {
        Self::new(0.10)
    }
}

impl KlineDojiIndicator {
    pub fn new(max_body_ratio: f64) -> Self {
        Self { max_body_ratio }
    }

    /// 振幅为 0 的K线不算十字星
    pub fn is_doji(&self, candle: &CandleItem) -> bool {
        let range = candle.range();
        range > 0.0 && candle.body() / range < self.max_body_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(o: f64, h: f64, l: f64, c: f64) -> CandleItem {
        CandleItem::builder().ts(0).o(o).h(h).l(l).c(c).build().unwrap()
    }

    #[test]
    fn test_doji() {
        let indicator = KlineDojiIndicator::default();
        assert!(indicator.is_doji(&candle(100.0, 105.0, 95.0, 100.5)));
        assert!(!indicator.is_doji(&candle(100.0, 105.0, 95.0, 103.0)));
        assert!(!indicator.is_doji(&candle(100.0, 100.0, 100.0, 100.0)));
    }
}
