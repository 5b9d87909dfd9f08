use serde::{Deserialize, Serialize};
use std::fmt;

/// 规范化后的交易品种
///
/// `"EUR/USD"`、`"eur-usd"`、`"EUR/USD (OTC)"` 都归一为 `EURUSD`，OTC 标记单独保存。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    pub pair: String,
    pub otc: bool,
}

impl Symbol {
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        let otc = upper.contains("OTC");
        let without_otc = upper.replace("OTC", "");
        let pair: String = without_otc
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        Self { pair, otc }
    }

    /// 缓存与持久化使用的键，例如 `EURUSD` 或 `EURUSD_OTC`
    pub fn key(&self) -> String {
        if self.otc {
            format!("{}_OTC", self.pair)
        } else {
            self.pair.clone()
        }
    }

    /// 六位货币对的基础货币与报价货币
    pub fn fx_legs(&self) -> Option<(&str, &str)> {
        if self.pair.len() == 6 && self.pair.chars().all(|c| c.is_ascii_alphabetic()) {
            Some((&self.pair[..3], &self.pair[3..]))
        } else {
            None
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Symbol::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(Symbol::parse("EUR/USD").key(), "EURUSD");
        assert_eq!(Symbol::parse("eur-usd").key(), "EURUSD");
        let otc = Symbol::parse("EUR/USD (OTC)");
        assert!(otc.otc);
        assert_eq!(otc.pair, "EURUSD");
        assert_eq!(otc.key(), "EURUSD_OTC");
    }

    #[test]
    fn test_fx_legs() {
        let s = Symbol::parse("GBP/JPY OTC");
        assert_eq!(s.fx_legs(), Some(("GBP", "JPY")));
        assert_eq!(Symbol::parse("BTCUSDT").fx_legs(), None);
    }
}
