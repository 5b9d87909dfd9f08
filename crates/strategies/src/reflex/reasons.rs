use sniper_common::Direction;
use sniper_indicators::{Pattern, PatternType};

use super::{Consensus, ConsensusOutcome};
use crate::estimator::EstimatorResult;
use crate::timeframes::TimeframeAgreement;

const MAX_REASONS: usize = 5;

fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    match text.find(|c| c == '.' || c == '!' || c == '?' || c == '\n') {
        Some(i) => text[..=i].trim_end_matches('\n').trim(),
        None => text,
    }
}

/// 信号理由：共识摘要、Quant 权重最高的命中、Analyst 解释首句、最强形态、多周期共振；去重，最多 5 条
pub fn build_reasons(
    outcome: &ConsensusOutcome,
    quant: &EstimatorResult,
    analyst: &EstimatorResult,
    patterns: &[Pattern],
    agreement: &TimeframeAgreement,
) -> Vec<String> {
    let mut reasons: Vec<String> = Vec::with_capacity(MAX_REASONS);
    let mut push = |reason: String| {
        if !reason.is_empty() && reasons.len() < MAX_REASONS && !reasons.contains(&reason) {
            reasons.push(reason);
        }
    };

    push(match outcome.consensus {
        Consensus::Agree => format!("Quant and Analyst agree on {}", outcome.direction),
        Consensus::Disagree => {
            let leader = if analyst.confidence > quant.confidence {
                "Analyst"
            } else {
                "Quant"
            };
            format!("Estimators disagree; following {} ({})", leader, outcome.direction)
        }
    });

    for hit in quant
        .top_hits(usize::MAX)
        .into_iter()
        .filter(|h| h.side == outcome.direction)
        .take(2)
    {
        push(hit.detail.clone());
    }

    if analyst.direction == outcome.direction {
        push(first_sentence(&analyst.explanation).to_string());
    }

    let strongest = patterns
        .iter()
        .filter(|p| match outcome.direction {
            Direction::Up => p.pattern_type != PatternType::Bearish,
            Direction::Down => p.pattern_type != PatternType::Bullish,
        })
        .max_by_key(|p| (p.strength, p.reliability));
    if let Some(p) = strongest {
        push(format!("{} pattern", p.name));
    }

    if agreement.confirms(outcome.direction) {
        push(format!(
            "Multi-timeframe agreement ({:.0}%)",
            agreement.agreement
        ));
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{EstimatorSource, RuleHit, RuleKind};
    use crate::timeframes::TimeframeTrend;
    use sniper_common::{SignalQuality, Strength, Timeframe};
    use sniper_indicators::TrendBias;

    fn hit(detail: &str, side: Direction, weight: f64) -> RuleHit {
        RuleHit {
            rule: RuleKind::Rsi,
            side,
            weight,
            detail: detail.to_string(),
        }
    }

    #[test]
    fn test_reasons_ordered_deduped_capped() {
        let quant = EstimatorResult {
            direction: Direction::Up,
            confidence: 0.8,
            explanation: String::new(),
            source: EstimatorSource::Quant {
                breakdown: vec![
                    hit("EMA9 above EMA21", Direction::Up, 1.0),
                    hit("RSI oversold (22.0)", Direction::Up, 2.0),
                    hit("MACD negative", Direction::Down, 1.0),
                ],
            },
        };
        let analyst = EstimatorResult {
            direction: Direction::Up,
            confidence: 0.8,
            explanation: "RSI oversold (22.0). Buyers stepping in.".to_string(),
            source: EstimatorSource::Analyst {
                model: "m".to_string(),
            },
        };
        let outcome = ConsensusOutcome {
            direction: Direction::Up,
            confidence: 0.88,
            quality: SignalQuality::High,
            consensus: Consensus::Agree,
            combined: 0.8,
            approval: None,
        };
        let patterns = vec![
            Pattern {
                name: "Hammer".to_string(),
                pattern_type: PatternType::Bullish,
                strength: Strength::Strong,
                timeframe: Timeframe::M5,
                reliability: 70,
            },
            Pattern {
                name: "Doji".to_string(),
                pattern_type: PatternType::Neutral,
                strength: Strength::Weak,
                timeframe: Timeframe::M5,
                reliability: 55,
            },
        ];
        let agreement = TimeframeAgreement::analyze(&[]);
        let reasons = build_reasons(&outcome, &quant, &analyst, &patterns, &agreement);
        assert_eq!(
            reasons,
            vec![
                "Quant and Analyst agree on UP".to_string(),
                "RSI oversold (22.0)".to_string(),
                "EMA9 above EMA21".to_string(),
                "RSI oversold (22.0).".to_string(),
                "Hammer pattern".to_string(),
            ]
        );
        assert!(reasons.len() <= MAX_REASONS);
    }

    #[test]
    fn test_timeframe_agreement_reason() {
        let quant = EstimatorResult {
            direction: Direction::Down,
            confidence: 0.7,
            explanation: String::new(),
            source: EstimatorSource::Quant {
                breakdown: vec![hit("MACD negative", Direction::Down, 1.0)],
            },
        };
        let analyst = EstimatorResult {
            direction: Direction::Up,
            confidence: 0.6,
            explanation: "Bounce expected.".to_string(),
            source: EstimatorSource::Analyst {
                model: "m".to_string(),
            },
        };
        let outcome = ConsensusOutcome {
            direction: Direction::Down,
            confidence: 0.7,
            quality: SignalQuality::Medium,
            consensus: Consensus::Disagree,
            combined: 0.7,
            approval: None,
        };
        let bearish = TimeframeAgreement::analyze(&[
            TimeframeTrend {
                timeframe: Timeframe::M1,
                trend: TrendBias::Bearish,
            },
            TimeframeTrend {
                timeframe: Timeframe::M15,
                trend: TrendBias::Bearish,
            },
        ]);
        let reasons = build_reasons(&outcome, &quant, &analyst, &[], &bearish);
        assert_eq!(
            reasons,
            vec![
                "Estimators disagree; following Quant (DOWN)".to_string(),
                "MACD negative".to_string(),
                "Multi-timeframe agreement (100%)".to_string(),
            ]
        );

        let flipped = ConsensusOutcome {
            direction: Direction::Up,
            ..outcome
        };
        let reasons = build_reasons(&flipped, &quant, &analyst, &[], &bearish);
        assert!(!reasons.iter().any(|r| r.starts_with("Multi-timeframe")));
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(first_sentence("  Up move. More text"), "Up move.");
        assert_eq!(first_sentence("no punctuation"), "no punctuation");
        assert_eq!(first_sentence("line one\nline two"), "line one");
    }
}
