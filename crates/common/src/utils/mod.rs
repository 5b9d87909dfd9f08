//! 工具函数模块

pub mod time;

pub use time::*;
