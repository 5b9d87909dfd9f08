//! 指标快照：对最近窗口内的K线一次性计算全部指标
//!
//! 每个周期整体重算，不在周期之间保留任何指标状态。

use serde::{Deserialize, Serialize};
use tracing::debug;

use sniper_common::{CandleItem, VolatilityLevel};

use crate::config::IndicatorPeriods;
use crate::error::IndicatorError;
use crate::momentum::{
    CciIndicator, MacdIndicator, MacdOutput, RsiIndicator, StochasticIndicator, StochasticOutput,
    WilliamsRIndicator,
};
use crate::trend::{EmaIndicator, SmaIndicator};
use crate::volatility::{BollingerIndicator, BollingerOutput, ATR};
use crate::volume::{VolumeRatioIndicator, VolumeStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendBias {
    Bullish,
    #[default]
    Neutral,
    Bearish,
}

/// 全部指标的计算结果，`None` 表示数据不足
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub candle_count: usize,
    pub last_close: Option<f64>,
    pub prev_close: Option<f64>,
    pub rsi: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub ema_anchor: Option<f64>,
    pub ema_trend: Option<f64>,
    pub sma: Option<f64>,
    pub macd: Option<MacdOutput>,
    pub bollinger: Option<BollingerOutput>,
    pub atr: Option<f64>,
    pub stochastic: Option<StochasticOutput>,
    pub williams_r: Option<f64>,
    pub cci: Option<f64>,
    pub volume: Option<VolumeStats>,
    pub volatility: VolatilityLevel,
    pub trend: TrendBias,
}

impl IndicatorSnapshot {
    /// ATR 占最新收盘价的百分比
    pub fn atr_percent(&self) -> Option<f64> {
        match (self.atr, self.last_close) {
            (Some(atr), Some(close)) if close > 0.0 => Some(atr / close * 100.0),
            _ => None,
        }
    }

    /// 最新收盘价相对前一根的涨跌，数据不足为 None
    pub fn momentum(&self) -> Option<f64> {
        match (self.last_close, self.prev_close) {
            (Some(last), Some(prev)) => Some(last - prev),
            _ => None,
        }
    }

    /// 有序的 名称 -> 数值 列表，用于提示词与日志；不可用的指标不出现
    pub fn to_feature_map(&self) -> Vec<(&'static str, f64)> {
        let mut features = Vec::new();
        let mut push = |name: &'static str, value: Option<f64>| {
            if let Some(v) = value {
                features.push((name, v));
            }
        };
        push("close", self.last_close);
        push("prev_close", self.prev_close);
        push("rsi", self.rsi);
        push("ema_fast", self.ema_fast);
        push("ema_slow", self.ema_slow);
        push("ema_anchor", self.ema_anchor);
        push("ema_trend", self.ema_trend);
        push("sma", self.sma);
        push("macd", self.macd.map(|m| m.macd));
        push("macd_signal", self.macd.and_then(|m| m.signal));
        push("macd_histogram", self.macd.and_then(|m| m.histogram));
        push("bb_upper", self.bollinger.map(|b| b.upper));
        push("bb_middle", self.bollinger.map(|b| b.middle));
        push("bb_lower", self.bollinger.map(|b| b.lower));
        push("bb_bandwidth", self.bollinger.map(|b| b.bandwidth));
        push("atr", self.atr);
        push("atr_percent", self.atr_percent());
        push("stoch_k", self.stochastic.map(|s| s.k));
        push("stoch_d", self.stochastic.and_then(|s| s.d));
        push("williams_r", self.williams_r);
        push("cci", self.cci);
        push("volume_ratio", self.volume.and_then(|v| v.ratio));
        features
    }
}

/// 指标引擎：纯函数，输入K线窗口输出快照
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    periods: IndicatorPeriods,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            periods: IndicatorPeriods::default(),
        }
    }
}

impl IndicatorEngine {
    pub fn new(periods: IndicatorPeriods) -> Result<Self, IndicatorError> {
        periods.validate()?;
        Ok(Self { periods })
    }

    pub fn periods(&self) -> &IndicatorPeriods {
        &self.periods
    }

    /// 计算最近 `window_size` 根K线的全部指标
    pub fn compute(&self, candles: &[CandleItem]) -> Result<IndicatorSnapshot, IndicatorError> {
        let p = &self.periods;
        let start = candles.len().saturating_sub(p.window_size);
        let window = &candles[start..];

        let mut rsi = RsiIndicator::new(p.rsi)?;
        let mut ema_fast = EmaIndicator::new(p.ema_fast)?;
        let mut ema_slow = EmaIndicator::new(p.ema_slow)?;
        let mut ema_anchor = EmaIndicator::new(p.ema_anchor)?;
        let mut ema_trend = EmaIndicator::new(p.ema_trend)?;
        let mut sma = SmaIndicator::new(p.sma)?;
        let mut macd = MacdIndicator::new(p.macd_fast, p.macd_slow, p.macd_signal)?;
        let mut bollinger = BollingerIndicator::new(p.bollinger, p.bollinger_k)?;
        let mut atr = ATR::new(p.atr)?;
        let mut stochastic = StochasticIndicator::new(p.stochastic, p.stochastic_smooth)?;
        let mut williams = WilliamsRIndicator::new(p.williams)?;
        let mut cci = CciIndicator::new(p.cci)?;
        let mut volume = VolumeRatioIndicator::new(p.volume)?;

        let mut snapshot = IndicatorSnapshot {
            candle_count: window.len(),
            ..IndicatorSnapshot::default()
        };

        for candle in window {
            let (h, l, c) = (candle.h(), candle.l(), candle.c());
            snapshot.rsi = rsi.next(c);
            snapshot.ema_fast = ema_fast.next(c);
            snapshot.ema_slow = ema_slow.next(c);
            snapshot.ema_anchor = ema_anchor.next(c);
            snapshot.ema_trend = ema_trend.next(c);
            snapshot.sma = sma.next(c);
            snapshot.macd = macd.next(c);
            snapshot.bollinger = bollinger.next(c);
            snapshot.atr = atr.next(h, l, c);
            snapshot.stochastic = stochastic.next(h, l, c);
            snapshot.williams_r = williams.next(h, l, c);
            snapshot.cci = cci.next(h, l, c);
            snapshot.volume = volume.next(candle.v());
        }

        snapshot.last_close = window.last().map(|c| c.c());
        snapshot.prev_close = window.len().checked_sub(2).map(|i| window[i].c());
        snapshot.volatility = self.classify_volatility(&snapshot);
        snapshot.trend = Self::classify_trend(&snapshot);

        debug!(
            "指标快照 candles={} rsi={:?} ema_fast={:?} ema_slow={:?} volatility={:?}",
            snapshot.candle_count, snapshot.rsi, snapshot.ema_fast, snapshot.ema_slow, snapshot.volatility
        );
        Ok(snapshot)
    }

    fn classify_volatility(&self, snapshot: &IndicatorSnapshot) -> VolatilityLevel {
        match snapshot.atr_percent() {
            Some(pct) if pct > self.periods.volatility.high_pct => VolatilityLevel::High,
            Some(pct) if pct < self.periods.volatility.low_pct => VolatilityLevel::Low,
            _ => VolatilityLevel::Normal,
        }
    }

    fn classify_trend(snapshot: &IndicatorSnapshot) -> TrendBias {
        let (fast, slow) = match (snapshot.ema_fast, snapshot.ema_slow) {
            (Some(f), Some(s)) => (f, s),
            _ => return TrendBias::Neutral,
        };
        let close = snapshot.last_close.unwrap_or(fast);
        let above_trend = snapshot.ema_trend.map_or(true, |t| close > t);
        let below_trend = snapshot.ema_trend.map_or(true, |t| close < t);
        if fast > slow && above_trend {
            TrendBias::Bullish
        } else if fast < slow && below_trend {
            TrendBias::Bearish
        } else {
            TrendBias::Neutral
        }
    }
}
