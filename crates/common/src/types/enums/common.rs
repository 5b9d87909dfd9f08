use serde::{Deserialize, Serialize};
use std::fmt;

pub trait EnumAsStrTrait {
    fn as_str(&self) -> &'static str;
}

/// 交易方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "UP", alias = "up", alias = "CALL", alias = "call")]
    Up,
    #[serde(rename = "DOWN", alias = "down", alias = "PUT", alias = "put")]
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// 宽松解析：UP/BUY/CALL/LONG/BULLISH 为上涨，DOWN/SELL/PUT/SHORT/BEARISH 为下跌
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "UP" | "BUY" | "CALL" | "LONG" | "BULLISH" | "HIGHER" => Some(Direction::Up),
            "DOWN" | "SELL" | "PUT" | "SHORT" | "BEARISH" | "LOWER" => Some(Direction::Down),
            _ => None,
        }
    }
}

impl EnumAsStrTrait for Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// K 线周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h", alias = "1H", alias = "60m")]
    H1,
    #[serde(rename = "4h", alias = "4H")]
    H4,
    #[serde(rename = "1d", alias = "1D")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    /// 解析周期字符串，无法识别返回 None
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(' ', "");
        let tf = match normalized.as_str() {
            "1m" | "1min" | "m1" | "60s" => Timeframe::M1,
            "3m" | "3min" | "m3" => Timeframe::M3,
            "5m" | "5min" | "m5" => Timeframe::M5,
            "15m" | "15min" | "m15" => Timeframe::M15,
            "30m" | "30min" | "m30" => Timeframe::M30,
            "1h" | "60m" | "60min" | "h1" | "1hour" => Timeframe::H1,
            "4h" | "240m" | "240min" | "h4" => Timeframe::H4,
            "1d" | "d1" | "1day" | "24h" => Timeframe::D1,
            _ => return None,
        };
        Some(tf)
    }

    /// 解析周期字符串，无法识别时回退到 5 分钟
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|| {
            tracing::warn!("未知周期 {}，使用默认 5m", s);
            Timeframe::M5
        })
    }

    pub fn duration_ms(&self) -> i64 {
        let minutes = match self {
            Timeframe::M1 => 1,
            Timeframe::M3 => 3,
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        };
        minutes * 60_000
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::M5
    }
}

impl EnumAsStrTrait for Timeframe {
    fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 信号质量分级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalQuality {
    High,
    Medium,
    Low,
}

impl EnumAsStrTrait for SignalQuality {
    fn as_str(&self) -> &'static str {
        match self {
            SignalQuality::High => "HIGH",
            SignalQuality::Medium => "MEDIUM",
            SignalQuality::Low => "LOW",
        }
    }
}

/// 强度等级，信号与形态共用
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Weak,
    Medium,
    Strong,
    VeryStrong,
}

impl Strength {
    /// 由 0-100 置信度得到信号强度标签
    pub fn from_confidence(confidence_pct: f64) -> Self {
        if confidence_pct > 85.0 {
            Strength::VeryStrong
        } else if confidence_pct > 75.0 {
            Strength::Strong
        } else if confidence_pct > 65.0 {
            Strength::Medium
        } else {
            Strength::Weak
        }
    }
}

impl EnumAsStrTrait for Strength {
    fn as_str(&self) -> &'static str {
        match self {
            Strength::Weak => "weak",
            Strength::Medium => "medium",
            Strength::Strong => "strong",
            Strength::VeryStrong => "very_strong",
        }
    }
}

/// 交易结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Pending,
    Win,
    Loss,
    Breakeven,
    Expired,
    Cancelled,
}

impl TradeResult {
    pub fn is_settled(&self) -> bool {
        !matches!(self, TradeResult::Pending)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(TradeResult::Pending),
            "win" | "won" => Some(TradeResult::Win),
            "loss" | "lose" | "lost" => Some(TradeResult::Loss),
            "breakeven" | "draw" | "tie" => Some(TradeResult::Breakeven),
            "expired" => Some(TradeResult::Expired),
            "cancelled" | "canceled" => Some(TradeResult::Cancelled),
            _ => None,
        }
    }
}

impl EnumAsStrTrait for TradeResult {
    fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Pending => "pending",
            TradeResult::Win => "win",
            TradeResult::Loss => "loss",
            TradeResult::Breakeven => "breakeven",
            TradeResult::Expired => "expired",
            TradeResult::Cancelled => "cancelled",
        }
    }
}

/// 波动率分级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityLevel {
    Low,
    #[default]
    Normal,
    High,
}

impl EnumAsStrTrait for VolatilityLevel {
    fn as_str(&self) -> &'static str {
        match self {
            VolatilityLevel::Low => "low",
            VolatilityLevel::Normal => "normal",
            VolatilityLevel::High => "high",
        }
    }
}

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl EnumAsStrTrait for RiskLevel {
    fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}
