//! 数据访问层模块

pub mod state_repository;

pub use state_repository::{
    load_json, load_json_or_default, save_json, FileStateStore, MemoryStateStore,
    RedisStateStore, StateBackend, StateStore, StoreError,
};
