//! # OTC Sniper Infrastructure
//!
//! 基础设施层
//!
//! ## 职责
//!
//! 1. **状态持久化**: 纪律/风控/账本/信号历史的键值存储（文件、Redis、内存）
//! 2. **缓存管理**: 带 TTL 的通用内存缓存
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use sniper_infrastructure::repositories::{FileStateStore, save_json, load_json};
//!
//! let store = FileStateStore::new("state");
//! save_json(&store, "risk_state", &state).await?;
//! let restored: Option<RiskState> = load_json(&store, "risk_state").await?;
//! ```

pub mod cache;
pub mod repositories;

// 重新导出常用类型
pub use cache::{CacheProvider, InMemoryCache};
pub use repositories::{
    load_json, load_json_or_default, save_json, FileStateStore, MemoryStateStore,
    RedisStateStore, StateBackend, StateStore, StoreError,
};
