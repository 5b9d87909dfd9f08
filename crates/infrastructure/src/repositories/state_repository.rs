//! 治理状态持久化
//!
//! 纪律状态、风控状态、交易账本、信号历史各自作为独立的键值记录保存。
//! 记录内容统一为 JSON 字符串，具体后端可以是本地文件、Redis 或内存。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use sniper_core::cache::{get_redis_connection, init_redis_pool, state_key};
use sniper_core::config::{env_or_default, env_opt};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("非法的记录键: {0}")]
    InvalidKey(String),

    #[error("记录 {key} 读写失败: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("记录 {key} 内容损坏: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("记录 {key} 序列化失败: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Redis 错误: {0}")]
    Redis(String),
}

impl StoreError {
    /// 内容损坏可以安全地回退到默认值，其余错误需要上报
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

/// 状态存储接口
#[async_trait]
pub trait StateStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn save(&self, key: &str, payload: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

fn check_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// 读取并反序列化一条记录
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.load(key).await? {
        Some(payload) => serde_json::from_str(&payload)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// 读取记录，缺失或损坏时回退到默认值（损坏会告警）
pub async fn load_json_or_default<T: DeserializeOwned + Default>(
    store: &dyn StateStore,
    key: &str,
) -> Result<T, StoreError> {
    match load_json(store, key).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            debug!("状态记录 {} 不存在，使用默认值", key);
            Ok(T::default())
        }
        Err(e) if e.is_corrupt() => {
            warn!("状态记录 {} 损坏，重置为默认值: {}", key, e);
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}

/// 序列化并保存一条记录
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let payload = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.save(key, &payload).await
}

/// 本地 JSON 文件存储：每条记录一个 `<key>.json`，先写临时文件再原子替换
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        check_key(key)?;
        match tokio::fs::read_to_string(self.path_of(key)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn save(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        check_key(key)?;
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let target = self.path_of(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        tokio::fs::write(&tmp, payload).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &target).await.map_err(io_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        match tokio::fs::remove_file(self.path_of(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Redis 存储，键为 `sniper:state:<key>`，不设置过期
#[derive(Default)]
pub struct RedisStateStore;

#[async_trait]
impl StateStore for RedisStateStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        check_key(key)?;
        let mut conn = get_redis_connection()
            .await
            .map_err(|e| StoreError::Redis(e.to_string()))?;
        let payload: Option<String> = conn
            .get(state_key(key))
            .await
            .map_err(|e| StoreError::Redis(e.to_string()))?;
        Ok(payload)
    }

    async fn save(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        check_key(key)?;
        let mut conn = get_redis_connection()
            .await
            .map_err(|e| StoreError::Redis(e.to_string()))?;
        let _: () = conn
            .set(state_key(key), payload)
            .await
            .map_err(|e| StoreError::Redis(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        let mut conn = get_redis_connection()
            .await
            .map_err(|e| StoreError::Redis(e.to_string()))?;
        let _: () = conn
            .del(state_key(key))
            .await
            .map_err(|e| StoreError::Redis(e.to_string()))?;
        Ok(())
    }
}

/// 内存存储，进程退出即丢失
#[derive(Default)]
pub struct MemoryStateStore {
    records: DashMap<String, String>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        check_key(key)?;
        Ok(self.records.get(key).map(|v| v.value().clone()))
    }

    async fn save(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.records.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.records.remove(key);
        Ok(())
    }
}

/// 存储后端配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBackend {
    File(PathBuf),
    Redis,
    Memory,
}

impl StateBackend {
    /// `STATE_BACKEND`=file|redis|memory，`STATE_DIR` 默认 `state`
    pub fn from_env() -> Self {
        match env_opt("STATE_BACKEND")
            .unwrap_or_else(|| "file".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "redis" => StateBackend::Redis,
            "memory" => StateBackend::Memory,
            other => {
                if other != "file" {
                    warn!("未知的 STATE_BACKEND={}，使用 file", other);
                }
                StateBackend::File(PathBuf::from(env_or_default("STATE_DIR", "state")))
            }
        }
    }

    /// 打开存储，Redis 后端会先初始化连接池
    pub async fn open(&self) -> anyhow::Result<Arc<dyn StateStore>> {
        let store: Arc<dyn StateStore> = match self {
            StateBackend::File(dir) => Arc::new(FileStateStore::new(dir.clone())),
            StateBackend::Redis => {
                init_redis_pool().await?;
                Arc::new(RedisStateStore)
            }
            StateBackend::Memory => Arc::new(MemoryStateStore::new()),
        };
        info!("状态存储后端: {}", store.backend());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
    }

    #[tokio::test]
    async fn test_file_store_roundtrip_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested"));

        assert_eq!(load_json::<Counter>(&store, "counter").await.unwrap(), None);
        save_json(&store, "counter", &Counter { value: 3 }).await.unwrap();
        let loaded: Option<Counter> = load_json(&store, "counter").await.unwrap();
        assert_eq!(loaded, Some(Counter { value: 3 }));
        assert!(!dir.path().join("nested/counter.json.tmp").exists());

        store.delete("counter").await.unwrap();
        store.delete("counter").await.unwrap();
        assert_eq!(store.load("counter").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_record_falls_back_to_default() {
        let store = MemoryStateStore::new();
        store.save("counter", "{not json").await.unwrap();

        let err = load_json::<Counter>(&store, "counter").await.unwrap_err();
        assert!(err.is_corrupt());

        let value: Counter = load_json_or_default(&store, "counter").await.unwrap();
        assert_eq!(value, Counter::default());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let store = MemoryStateStore::new();
        assert!(matches!(
            store.save("../etc", "{}").await,
            Err(StoreError::InvalidKey(_))
        ));
    }
}
