//! 缓存管理

pub mod redis_client;

// 重新导出
pub use redis_client::{
    cleanup_redis_pool, get_redis_connection, init_redis_pool, state_key, STATE_KEY_PREFIX,
};
