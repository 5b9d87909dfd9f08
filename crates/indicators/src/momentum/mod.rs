//! 动量指标

pub mod cci;
pub mod macd;
pub mod rsi;
pub mod stochastic;
pub mod williams_r;

// 重新导出
pub use cci::CciIndicator;
pub use macd::{MacdIndicator, MacdOutput};
pub use rsi::RsiIndicator;
pub use stochastic::{StochasticIndicator, StochasticOutput};
pub use williams_r::WilliamsRIndicator;
