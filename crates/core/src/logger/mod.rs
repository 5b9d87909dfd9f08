//! 日志初始化

pub mod setup;

pub use setup::setup_logging;
