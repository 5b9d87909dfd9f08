//! 趋势指标

pub mod ema;
pub mod sma;

// 重新导出
pub use ema::EmaIndicator;
pub use sma::SmaIndicator;
