//! 形态识别指标

pub mod detector;
pub mod doji;
pub mod engulfing;
pub mod hammer;
pub mod types;

// 重新导出
pub use detector::PatternDetector;
pub use doji::KlineDojiIndicator;
pub use engulfing::{KlineEngulfingIndicator, KlineEngulfingOutput};
pub use hammer::{KlineHammerIndicator, KlineHammerIndicatorOutput};
pub use types::{Pattern, PatternType};
