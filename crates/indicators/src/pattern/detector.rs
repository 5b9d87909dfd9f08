use sniper_common::{CandleItem, Strength, Timeframe};

use super::doji::KlineDojiIndicator;
use super::engulfing::KlineEngulfingIndicator;
use super::hammer::KlineHammerIndicator;
use super::types::{Pattern, PatternType};

/// 无状态形态识别器，只看最近 2-3 根K线，返回全部命中的形态
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    doji: KlineDojiIndicator,
    engulfing: KlineEngulfingIndicator,
    hammer: KlineHammerIndicator,
}

fn upgrade(strength: Strength) -> Strength {
    match strength {
        Strength::Weak => Strength::Medium,
        Strength::Medium => Strength::Strong,
        Strength::Strong | Strength::VeryStrong => Strength::VeryStrong,
    }
}

impl PatternDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect(&self, candles: &[CandleItem], timeframe: Timeframe) -> Vec<Pattern> {
        let mut patterns = Vec::new();
        let n = candles.len();
        let current = match candles.last() {
            Some(c) => c,
            None => return patterns,
        };
        let previous = n.checked_sub(2).map(|i| &candles[i]);
        // 当前K线之前的两根，用于判断上下文走势
        let context: &[CandleItem] = if n >= 3 { &candles[n - 3..n - 1] } else { &[] };
        let prior_bearish = context.len() == 2 && context.iter().all(|c| c.is_bearish());
        let prior_bullish = context.len() == 2 && context.iter().all(|c| c.is_bullish());

        let make = |name: &str, pattern_type, strength, reliability| Pattern {
            name: name.to_string(),
            pattern_type,
            strength,
            timeframe,
            reliability,
        };

        if self.doji.is_doji(current) {
            if prior_bearish || prior_bullish {
                patterns.push(make("Doji", PatternType::Reversal, Strength::Medium, 60));
            } else {
                patterns.push(make("Doji", PatternType::Neutral, Strength::Weak, 55));
            }
        }

        if let Some(prev) = previous {
            if let Some(out) = self.engulfing.evaluate(prev, current) {
                let (strength, reliability) = if out.body_ratio >= 2.0 {
                    (Strength::VeryStrong, 85)
                } else if out.body_ratio >= 1.5 {
                    (Strength::Strong, 78)
                } else {
                    (Strength::Medium, 70)
                };
                if out.is_bullish {
                    patterns.push(make("Bullish Engulfing", PatternType::Bullish, strength, reliability));
                } else {
                    patterns.push(make("Bearish Engulfing", PatternType::Bearish, strength, reliability));
                }
            }
        }

        let hammer = self.hammer.next(current);
        let pin_bar = hammer.body_ratio < 0.10;
        if hammer.is_hammer {
            let (name, mut strength, mut reliability) = if pin_bar {
                ("Pin Bar", Strength::Strong, 65)
            } else {
                ("Hammer", Strength::Medium, 60)
            };
            if prior_bearish {
                strength = upgrade(strength);
                reliability += 10;
            }
            patterns.push(make(name, PatternType::Bullish, strength, reliability));
        }
        if hammer.is_shooting_star {
            let (name, mut strength, mut reliability) = if pin_bar {
                ("Bearish Pin Bar", Strength::Strong, 65)
            } else {
                ("Shooting Star", Strength::Medium, 60)
            };
            if prior_bullish {
                strength = upgrade(strength);
                reliability += 10;
            }
            patterns.push(make(name, PatternType::Bearish, strength, reliability));
        }

        patterns
    }
}
