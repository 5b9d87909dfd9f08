//! 提示词构造
//!
//! 分析提示词只包含指标快照与形态，不带历史K线原文，控制 token 数。

use std::fmt::Write;

use sniper_common::{Direction, EnumAsStrTrait, Symbol, Timeframe};
use sniper_indicators::{IndicatorSnapshot, Pattern};

pub const ANALYST_SYSTEM_PROMPT: &str = "You are a disciplined short-term FX analyst for binary \
options. Decide whether price will be higher (UP) or lower (DOWN) at the end of the next candle. \
Reply with a single JSON object: {\"direction\": \"UP\"|\"DOWN\", \"confidence\": 0.0-1.0, \
\"explanation\": \"one or two sentences\"}. No other text.";

pub const REFLEX_SYSTEM_PROMPT: &str = "You are a risk reviewer. Two independent estimators \
produced a directional call. Approve only if the evidence is coherent and the setup is clean. \
Reply with a single JSON object: {\"approved\": true|false, \"reason\": \"short reason\"}. \
No other text.";

/// 分析提示词：品种、周期、指标数值、形态
pub fn build_analysis_prompt(
    symbol: &Symbol,
    timeframe: Timeframe,
    snapshot: &IndicatorSnapshot,
    patterns: &[Pattern],
) -> String {
    let mut prompt = String::new();
    let market = if symbol.otc { "OTC" } else { "spot" };
    let _ = writeln!(prompt, "Instrument: {} ({})", symbol.pair, market);
    let _ = writeln!(prompt, "Timeframe: {}", timeframe);
    let _ = writeln!(prompt, "Candles analysed: {}", snapshot.candle_count);
    let _ = writeln!(
        prompt,
        "Trend bias: {:?}, volatility: {}",
        snapshot.trend,
        snapshot.volatility.as_str()
    );
    let _ = writeln!(prompt, "Indicators:");
    for (name, value) in snapshot.to_feature_map() {
        let _ = writeln!(prompt, "- {}: {:.5}", name, value);
    }
    if patterns.is_empty() {
        let _ = writeln!(prompt, "Candlestick patterns: none");
    } else {
        let _ = writeln!(prompt, "Candlestick patterns:");
        for p in patterns {
            let _ = writeln!(
                prompt,
                "- {} ({:?}, {}, reliability {})",
                p.name,
                p.pattern_type,
                p.strength.as_str(),
                p.reliability
            );
        }
    }
    let _ = write!(prompt, "Predict the direction of the next {} candle.", timeframe);
    prompt
}

/// 审批时提供给模型的双方结论
#[derive(Debug, Clone)]
pub struct ApprovalContext<'a> {
    pub symbol: &'a Symbol,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub combined_confidence: f64,
    pub quant_summary: &'a str,
    pub analyst_summary: &'a str,
}

pub fn build_approval_prompt(ctx: &ApprovalContext<'_>) -> String {
    format!(
        "Instrument: {} {}\nProposed direction: {}\nCombined confidence: {:.2}\n\
         Quant estimator: {}\nAnalyst estimator: {}\nShould this signal be approved?",
        ctx.symbol,
        ctx.timeframe,
        ctx.direction.as_str(),
        ctx.combined_confidence,
        ctx.quant_summary,
        ctx.analyst_summary
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sniper_common::Strength;
    use sniper_indicators::PatternType;

    #[test]
    fn test_analysis_prompt_lists_features_and_patterns() {
        let snapshot = IndicatorSnapshot {
            candle_count: 40,
            last_close: Some(1.0855),
            rsi: Some(28.4),
            ..IndicatorSnapshot::default()
        };
        let patterns = vec![Pattern {
            name: "Hammer".to_string(),
            pattern_type: PatternType::Bullish,
            strength: Strength::Strong,
            timeframe: Timeframe::M5,
            reliability: 70,
        }];
        let prompt =
            build_analysis_prompt(&Symbol::parse("EUR/USD OTC"), Timeframe::M5, &snapshot, &patterns);
        assert!(prompt.contains("EURUSD (OTC)"));
        assert!(prompt.contains("- rsi: 28.40000"));
        assert!(prompt.contains("Hammer"));
        assert!(!prompt.contains("macd"));
    }

    #[test]
    fn test_approval_prompt() {
        let symbol = Symbol::parse("GBPUSD");
        let prompt = build_approval_prompt(&ApprovalContext {
            symbol: &symbol,
            timeframe: Timeframe::M1,
            direction: Direction::Down,
            combined_confidence: 0.78,
            quant_summary: "DOWN 0.80",
            analyst_summary: "DOWN 0.76",
        });
        assert!(prompt.contains("Proposed direction: DOWN"));
        assert!(prompt.contains("0.78"));
    }
}
