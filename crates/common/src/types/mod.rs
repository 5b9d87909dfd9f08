//! 公共类型定义

pub mod candle_types;
pub mod enums;
pub mod symbol;

// 重新导出
pub use candle_types::*;
pub use enums::*;
pub use symbol::*;
