//! # OTC Sniper Core
//!
//! 核心基础设施：环境配置读取、日志、Redis 连接池、优雅关闭

pub mod cache;
pub mod config;
pub mod logger;
