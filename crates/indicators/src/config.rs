use serde::{Deserialize, Serialize};

use sniper_core::config::{env_f64, env_usize};

use crate::error::{check_period, IndicatorError};

/// 指标周期配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPeriods {
    pub rsi: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    /// 分析师回退投票使用的 EMA20
    pub ema_anchor: usize,
    pub ema_trend: usize,
    pub sma: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger: usize,
    pub bollinger_k: f64,
    pub atr: usize,
    pub stochastic: usize,
    pub stochastic_smooth: usize,
    pub williams: usize,
    pub cci: usize,
    pub volume: usize,
    /// 参与计算的最近 K 线数量
    pub window_size: usize,
    pub volatility: VolatilityThresholds,
}

/// ATR 占价格百分比的波动率分级阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityThresholds {
    pub high_pct: f64,
    pub low_pct: f64,
}

impl Default for VolatilityThresholds {
    fn default() -> Self {
        Self {
            high_pct: 0.30,
            low_pct: 0.05,
        }
    }
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            rsi: 14,
            ema_fast: 9,
            ema_slow: 21,
            ema_anchor: 20,
            ema_trend: 50,
            sma: 20,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger: 20,
            bollinger_k: 2.0,
            atr: 14,
            stochastic: 14,
            stochastic_smooth: 3,
            williams: 14,
            cci: 20,
            volume: 20,
            window_size: 100,
            volatility: VolatilityThresholds::default(),
        }
    }
}

impl IndicatorPeriods {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            rsi: env_usize("RSI_PERIOD", d.rsi),
            ema_fast: env_usize("EMA_FAST_PERIOD", d.ema_fast),
            ema_slow: env_usize("EMA_SLOW_PERIOD", d.ema_slow),
            ema_anchor: env_usize("EMA_ANCHOR_PERIOD", d.ema_anchor),
            ema_trend: env_usize("EMA_TREND_PERIOD", d.ema_trend),
            sma: env_usize("SMA_PERIOD", d.sma),
            macd_fast: env_usize("MACD_FAST", d.macd_fast),
            macd_slow: env_usize("MACD_SLOW", d.macd_slow),
            macd_signal: env_usize("MACD_SIGNAL", d.macd_signal),
            bollinger: env_usize("BOLLINGER_PERIOD", d.bollinger),
            bollinger_k: env_f64("BOLLINGER_K", d.bollinger_k),
            atr: env_usize("ATR_PERIOD", d.atr),
            stochastic: env_usize("STOCH_PERIOD", d.stochastic),
            stochastic_smooth: env_usize("STOCH_SMOOTH", d.stochastic_smooth),
            williams: env_usize("WILLIAMS_PERIOD", d.williams),
            cci: env_usize("CCI_PERIOD", d.cci),
            volume: env_usize("VOLUME_PERIOD", d.volume),
            window_size: env_usize("INDICATOR_WINDOW", d.window_size),
            volatility: VolatilityThresholds {
                high_pct: env_f64("HIGH_VOLATILITY_PCT", d.volatility.high_pct),
                low_pct: env_f64("LOW_VOLATILITY_PCT", d.volatility.low_pct),
            },
        }
    }

    /// 校验全部周期大于 0、乘数为正、MACD 快线短于慢线
    pub fn validate(&self) -> Result<(), IndicatorError> {
        for period in [
            self.rsi,
            self.ema_fast,
            self.ema_slow,
            self.ema_anchor,
            self.ema_trend,
            self.sma,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
            self.bollinger,
            self.atr,
            self.stochastic,
            self.stochastic_smooth,
            self.williams,
            self.cci,
            self.volume,
            self.window_size,
        ] {
            check_period(period)?;
        }
        if !(self.bollinger_k.is_finite() && self.bollinger_k > 0.0) {
            return Err(IndicatorError::InvalidMultiplier(self.bollinger_k));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(IndicatorError::InvalidMacdPeriods {
                fast: self.macd_fast,
                slow: self.macd_slow,
            });
        }
        Ok(())
    }
}
