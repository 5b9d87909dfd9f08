//! # OTC Sniper Indicators
//!
//! 技术指标库：趋势、动量、波动性、成交量、K线形态，以及一次性计算全部指标的快照引擎。
//!
//! 所有指标都是流式结构（`new(period)` + `next(..)`），数据不足时输出 `None`。

pub mod config;
pub mod error;
pub mod momentum;
pub mod pattern;
pub mod snapshot;
pub mod trend;
pub mod volatility;
pub mod volume;

// 重新导出
pub use config::{IndicatorPeriods, VolatilityThresholds};
pub use error::IndicatorError;
pub use momentum::*;
pub use pattern::*;
pub use snapshot::{IndicatorEngine, IndicatorSnapshot, TrendBias};
pub use trend::*;
pub use volatility::*;
pub use volume::*;
