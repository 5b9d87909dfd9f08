//! Quant 估计器：确定性的多空计分
//!
//! 每条规则命中时给多头或空头加权重，方向取分高的一侧，
//! 置信度 = max(多, 空) / (多 + 空)，夹到 [0.55, 0.95]。

use sniper_common::{Direction, Strength};
use sniper_indicators::PatternType;

use crate::estimator::{AnalysisInput, EstimatorResult, EstimatorSource, RuleHit, RuleKind};

pub const MIN_CONFIDENCE: f64 = 0.55;
pub const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Default)]
pub struct QuantEstimator;

fn pattern_weight(strength: Strength) -> f64 {
    match strength {
        Strength::Weak | Strength::Medium => 1.0,
        Strength::Strong => 2.0,
        Strength::VeryStrong => 3.0,
    }
}

impl QuantEstimator {
    pub fn new() -> Self {
        Self
    }

    /// 逐条规则计分，返回全部命中
    pub fn score(&self, input: &AnalysisInput) -> Vec<RuleHit> {
        let s = &input.snapshot;
        let mut hits = Vec::new();
        let mut hit = |rule: RuleKind, side: Direction, weight: f64, detail: String| {
            hits.push(RuleHit {
                rule,
                side,
                weight,
                detail,
            })
        };

        if let Some(rsi) = s.rsi {
            if rsi < 30.0 {
                hit(RuleKind::Rsi, Direction::Up, 2.0, format!("RSI oversold ({:.1})", rsi));
            } else if rsi > 70.0 {
                hit(RuleKind::Rsi, Direction::Down, 2.0, format!("RSI overbought ({:.1})", rsi));
            }
        }

        if let (Some(fast), Some(slow)) = (s.ema_fast, s.ema_slow) {
            if fast > slow {
                hit(RuleKind::EmaCross, Direction::Up, 1.0, "EMA9 above EMA21".to_string());
            } else if fast < slow {
                hit(RuleKind::EmaCross, Direction::Down, 1.0, "EMA9 below EMA21".to_string());
            }
        }

        if let Some(macd) = s.macd {
            if macd.macd > 0.0 {
                hit(RuleKind::MacdZero, Direction::Up, 1.0, "MACD positive".to_string());
            } else if macd.macd < 0.0 {
                hit(RuleKind::MacdZero, Direction::Down, 1.0, "MACD negative".to_string());
            }
            if let Some(signal) = macd.signal {
                if macd.macd > signal {
                    hit(RuleKind::MacdSignal, Direction::Up, 1.0, "MACD above signal".to_string());
                } else if macd.macd < signal {
                    hit(RuleKind::MacdSignal, Direction::Down, 1.0, "MACD below signal".to_string());
                }
            }
        }

        if let (Some(close), Some(trend)) = (s.last_close, s.ema_trend) {
            if close > trend {
                hit(RuleKind::TrendEma, Direction::Up, 1.0, "Price above EMA50".to_string());
            } else if close < trend {
                hit(RuleKind::TrendEma, Direction::Down, 1.0, "Price below EMA50".to_string());
            }
        }

        if let (Some(close), Some(bb)) = (s.last_close, s.bollinger) {
            if close < bb.lower {
                hit(RuleKind::Bollinger, Direction::Up, 1.0, "Close below lower Bollinger band".to_string());
            } else if close > bb.upper {
                hit(RuleKind::Bollinger, Direction::Down, 1.0, "Close above upper Bollinger band".to_string());
            }
        }

        if let Some(stoch) = s.stochastic {
            if stoch.k < 20.0 {
                hit(RuleKind::Stochastic, Direction::Up, 1.0, format!("Stochastic oversold ({:.1})", stoch.k));
            } else if stoch.k > 80.0 {
                hit(RuleKind::Stochastic, Direction::Down, 1.0, format!("Stochastic overbought ({:.1})", stoch.k));
            }
        }

        if let Some(wr) = s.williams_r {
            if wr < -80.0 {
                hit(RuleKind::WilliamsR, Direction::Up, 1.0, format!("Williams %R oversold ({:.1})", wr));
            } else if wr > -20.0 {
                hit(RuleKind::WilliamsR, Direction::Down, 1.0, format!("Williams %R overbought ({:.1})", wr));
            }
        }

        if let Some(cci) = s.cci {
            if cci < -100.0 {
                hit(RuleKind::Cci, Direction::Up, 1.0, format!("CCI oversold ({:.0})", cci));
            } else if cci > 100.0 {
                hit(RuleKind::Cci, Direction::Down, 1.0, format!("CCI overbought ({:.0})", cci));
            }
        }

        let last_move = input.short_term_move();
        if let (Some(ratio), Some(side)) = (s.volume.and_then(|v| v.ratio), last_move) {
            if ratio > 1.5 {
                hit(RuleKind::Volume, side, 1.0, format!("Volume spike x{:.1} confirms move", ratio));
            }
        }

        for pattern in &input.patterns {
            let weight = pattern_weight(pattern.strength);
            let side = match pattern.pattern_type {
                PatternType::Bullish => Some(Direction::Up),
                PatternType::Bearish => Some(Direction::Down),
                PatternType::Reversal => last_move.map(Direction::opposite),
                PatternType::Neutral => None,
            };
            if let Some(side) = side {
                hit(RuleKind::Pattern, side, weight, format!("{} pattern", pattern.name));
            }
        }

        hits
    }

    pub fn estimate(&self, input: &AnalysisInput) -> EstimatorResult {
        let breakdown = self.score(input);
        let (bull, bear) = breakdown.iter().fold((0.0, 0.0), |(bull, bear), h| match h.side {
            Direction::Up => (bull + h.weight, bear),
            Direction::Down => (bull, bear + h.weight),
        });
        let total = bull + bear;

        let direction = if bull > bear {
            Direction::Up
        } else if bear > bull {
            Direction::Down
        } else {
            // 平局按最近一根的涨跌，持平视为上涨
            input.short_term_move().unwrap_or(Direction::Up)
        };
        let confidence = if total > 0.0 {
            (bull.max(bear) / total).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
        } else {
            MIN_CONFIDENCE
        };

        let explanation = if breakdown.is_empty() {
            "No rule fired; direction from last candle".to_string()
        } else {
            let mut ranked: Vec<&RuleHit> = breakdown.iter().filter(|h| h.side == direction).collect();
            ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
            let top: Vec<&str> = ranked.iter().take(3).map(|h| h.detail.as_str()).collect();
            format!("bull {:.0} vs bear {:.0}: {}", bull, bear, top.join(", "))
        };

        EstimatorResult {
            direction,
            confidence,
            explanation,
            source: EstimatorSource::Quant { breakdown },
        }
    }
}
