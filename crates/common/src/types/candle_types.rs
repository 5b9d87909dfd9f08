use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// 单根 K 线（OHLCV），时间戳为毫秒
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CandleItem {
    #[serde(alias = "open")]
    pub(crate) o: f64,
    #[serde(alias = "high")]
    pub(crate) h: f64,
    #[serde(alias = "low")]
    pub(crate) l: f64,
    #[serde(alias = "close")]
    pub(crate) c: f64,
    #[serde(alias = "volume", default)]
    pub(crate) v: f64,
    #[serde(alias = "timestamp")]
    pub(crate) ts: i64,
}

impl CandleItem {
    pub fn builder() -> CandleItemBuilder {
        CandleItemBuilder::new()
    }
    pub fn ts(&self) -> i64 { self.ts }
    pub fn o(&self) -> f64 { self.o }
    pub fn h(&self) -> f64 { self.h }
    pub fn l(&self) -> f64 { self.l }
    pub fn c(&self) -> f64 { self.c }
    pub fn v(&self) -> f64 { self.v }

    /// 实体大小
    pub fn body(&self) -> f64 {
        (self.c - self.o).abs()
    }

    /// 振幅（最高 - 最低）
    pub fn range(&self) -> f64 {
        self.h - self.l
    }

    pub fn upper_shadow(&self) -> f64 {
        self.h - self.o.max(self.c)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.o.min(self.c) - self.l
    }

    pub fn is_bullish(&self) -> bool {
        self.c > self.o
    }

    pub fn is_bearish(&self) -> bool {
        self.c < self.o
    }

    /// 校验 K 线不变式：全部有限，l <= min(o,c)，h >= max(o,c)，v >= 0
    ///
    /// 反序列化得到的 K 线必须经过这里再进入序列。
    pub fn validate(&self) -> Result<(), AppError> {
        let values = [self.o, self.h, self.l, self.c, self.v];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AppError::CandleInvalid(format!("非有限数值 ts={}", self.ts)));
        }
        if self.l > self.o.min(self.c) || self.h < self.o.max(self.c) || self.l > self.h {
            return Err(AppError::CandleInvalid(format!(
                "高低点不包含开收盘 ts={} o={} h={} l={} c={}",
                self.ts, self.o, self.h, self.l, self.c
            )));
        }
        if self.v < 0.0 {
            return Err(AppError::CandleInvalid(format!("成交量为负 ts={}", self.ts)));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CandleItemBuilder {
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
    ts: Option<i64>,
}

impl CandleItemBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn ts(mut self, val: i64) -> Self { self.ts = Some(val); self }
    pub fn o(mut self, val: f64) -> Self { self.o = Some(val); self }
    pub fn h(mut self, val: f64) -> Self { self.h = Some(val); self }
    pub fn l(mut self, val: f64) -> Self { self.l = Some(val); self }
    pub fn c(mut self, val: f64) -> Self { self.c = Some(val); self }
    pub fn v(mut self, val: f64) -> Self { self.v = Some(val); self }

    /// 构建 K 线，缺字段或违反不变式时返回错误。成交量缺省为 0（OTC 数据源常见）。
    pub fn build(self) -> Result<CandleItem, AppError> {
        let candle = CandleItem {
            o: self.o.ok_or(AppError::CandleIncomplete("o"))?,
            h: self.h.ok_or(AppError::CandleIncomplete("h"))?,
            l: self.l.ok_or(AppError::CandleIncomplete("l"))?,
            c: self.c.ok_or(AppError::CandleIncomplete("c"))?,
            v: self.v.unwrap_or(0.0),
            ts: self.ts.ok_or(AppError::CandleIncomplete("ts"))?,
        };
        candle.validate()?;
        Ok(candle)
    }
}
