//! 波动性指标

pub mod atr;
pub mod bollinger;

// 重新导出
pub use atr::ATR;
pub use bollinger::{BollingerIndicator, BollingerOutput};
