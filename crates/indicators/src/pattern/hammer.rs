use sniper_common::CandleItem;

/// 锤子/流星线形态指标
#[derive(Debug, Clone)]
pub struct KlineHammerIndicator {
    stander_shadow_ratio: f64,
    max_body_ratio: f64,
}

impl Default for KlineHammerIndicator {
    fn default() -> Self {
        Self::new(0.6, 0.3)
    }
}

/// 锤子/流星线形态指标输出
#[derive(Debug, Clone, Default)]
pub struct KlineHammerIndicatorOutput {
    //是否是锤子形态,是指下影线较长,上影线较短的形态
    pub is_hammer: bool,
    //是否是流星线形态,是指上影线较长,下影线较短的形态
    pub is_shooting_star: bool,
    //下影线比例
    pub down_shadow_ratio: f64,
    //上影线比例
    pub up_shadow_ratio: f64,
    //实体比例
    pub body_ratio: f64,
}

impl KlineHammerIndicator {
    pub fn new(shadow_ratio: f64, max_body_ratio: f64) -> Self {
        Self {
            stander_shadow_ratio: shadow_ratio,
            max_body_ratio,
        }
    }

    pub fn next(&self, current_kline: &CandleItem) -> KlineHammerIndicatorOutput {
        let range = current_kline.range();
        if range <= 0.0 {
            return KlineHammerIndicatorOutput::default();
        }
        let down_shadow_ratio = current_kline.lower_shadow() / range;
        let up_shadow_ratio = current_kline.upper_shadow() / range;
        let body_ratio = current_kline.body() / range;

        //长下影线
        let is_hammer = down_shadow_ratio > self.stander_shadow_ratio
            && body_ratio < self.max_body_ratio
            && down_shadow_ratio > up_shadow_ratio;

        //长上影线
        let is_shooting_star = up_shadow_ratio > self.stander_shadow_ratio
            && body_ratio < self.max_body_ratio
            && up_shadow_ratio > down_shadow_ratio;

        KlineHammerIndicatorOutput {
            is_hammer,
            is_shooting_star,
            down_shadow_ratio,
            up_shadow_ratio,
            body_ratio,
        }
    }
}

//添加测试单例
#[cfg(test)]
mod tests {
    use super::*;

    fn candle(o: f64, h: f64, l: f64, c: f64) -> CandleItem {
        CandleItem::builder().ts(0).o(o).h(h).l(l).c(c).build().unwrap()
    }

    #[test]
    fn test_kline_hammer_indicator() {
        let indicator = KlineHammerIndicator::default();

        // 价格下跌，长下影线
        let output = indicator.next(&candle(100.0, 102.0, 70.0, 95.0));
        assert!(output.is_hammer);
        assert!(!output.is_shooting_star);

        // 长上影线
        let output = indicator.next(&candle(100.0, 130.0, 98.0, 99.0));
        assert!(!output.is_hammer);
        assert!(output.is_shooting_star);

        // 上下影线都不够长
        let output = indicator.next(&candle(100.0, 110.0, 90.0, 101.0));
        assert!(!output.is_hammer);
        assert!(!output.is_shooting_star);

        // 实体过大
        let output = indicator.next(&candle(80.0, 101.0, 50.0, 100.0));
        assert!(!output.is_hammer);
    }

    #[test]
    fn test_zero_range_never_matches() {
        let output = KlineHammerIndicator::default().next(&candle(1.0, 1.0, 1.0, 1.0));
        assert!(!output.is_hammer && !output.is_shooting_star);
    }
}
