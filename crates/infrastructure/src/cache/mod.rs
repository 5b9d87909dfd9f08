//! 缓存模块

pub mod generic_cache;

pub use generic_cache::{CacheProvider, InMemoryCache};
