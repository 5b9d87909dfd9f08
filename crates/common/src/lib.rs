//! # OTC Sniper Common
//!
//! 公共类型、工具函数和错误定义：K线、方向、周期、交易结果、品种规范化、时钟

pub mod errors;
pub mod types;
pub mod utils;

// 重新导出常用类型
pub use errors::{AppError, Result};
pub use types::*;
pub use utils::time::{Clock, ManualClock, SystemClock};
