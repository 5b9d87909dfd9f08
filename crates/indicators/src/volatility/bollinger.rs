use serde::{Deserialize, Serialize};
use ta::indicators::BollingerBands;
use ta::Next;

use crate::error::{check_period, IndicatorError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle
    pub bandwidth: f64,
}

/// 布林带：SMA ± k * 总体标准差，窗口未满时输出 `None`
#[derive(Debug, Clone)]
pub struct BollingerIndicator {
    period: usize,
    seen: usize,
    bands: BollingerBands,
}

impl BollingerIndicator {
    pub fn new(period: usize, multiplier: f64) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(IndicatorError::InvalidMultiplier(multiplier));
        }
        Ok(Self {
            period,
            seen: 0,
            bands: BollingerBands::new(period, multiplier)
                .map_err(|_| IndicatorError::InvalidPeriod(period))?,
        })
    }

    pub fn next(&mut self, close: f64) -> Option<BollingerOutput> {
        let out = self.bands.next(close);
        self.seen += 1;
        if self.seen < self.period {
            return None;
        }
        let middle = out.average;
        let bandwidth = if middle != 0.0 {
            (out.upper - out.lower) / middle
        } else {
            0.0
        };
        Some(BollingerOutput {
            upper: out.upper,
            middle,
            lower: out.lower,
            bandwidth,
        })
    }
}
