//! 通用泛型缓存接口
//!
//! 内存 TTL 缓存，信号缓存与其他短期结果共用

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use dashmap::DashMap;
use tracing::debug;

/// 缓存提供者接口 - 通用trait
#[async_trait::async_trait]
pub trait CacheProvider<T>: Send + Sync
where
    T: Clone + Send + Sync,
{
    /// 获取缓存值（已过期视为不存在）
    async fn get(&self, key: &str) -> Result<Option<T>>;

    /// 设置缓存值，`ttl` 为空时使用默认 TTL
    async fn set(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()>;

    /// 删除缓存值
    async fn delete(&self, key: &str) -> Result<()>;

    /// 检查键是否存在
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// 内存缓存实现（使用DashMap）
#[derive(Clone)]
pub struct InMemoryCache<T>
where
    T: Clone + Send + Sync,
{
    map: Arc<DashMap<String, CacheEntry<T>>>,
    default_ttl: Option<Duration>,
}

#[derive(Clone)]
struct CacheEntry<T> {
    value: T,
    expire_at: Option<Instant>,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expire_at, Some(expire_at) if now >= expire_at)
    }
}

impl<T> InMemoryCache<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            map: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    /// 当前条目数（含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 清理所有过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.map.len();
        self.map.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.map.len());
        if removed > 0 {
            debug!("清理过期缓存 {} 条", removed);
        }
        removed
    }
}

#[async_trait::async_trait]
impl<T> CacheProvider<T> for InMemoryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<T>> {
        if let Some(entry) = self.map.get(key) {
            if !entry.is_expired(Instant::now()) {
                return Ok(Some(entry.value.clone()));
            }
            // 过期则删除
            drop(entry);
            self.map.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let expire_at = ttl.or(self.default_ttl).map(|d| Instant::now() + d);
        self.map.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expire_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }
}
