//! 治理状态的 Redis 存储连接

use std::env;

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use redis::aio::MultiplexedConnection;
use redis::Client;
use tracing::{error, info};

/// 治理状态在 Redis 中的键前缀
pub const STATE_KEY_PREFIX: &str = "sniper:state:";

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";

static STATE_CLIENT: OnceCell<Client> = OnceCell::new();

/// 读取 `REDIS_HOST` 建立客户端并验证一次连接，重复调用直接返回
pub async fn init_redis_pool() -> Result<()> {
    if STATE_CLIENT.get().is_some() {
        return Ok(());
    }
    let url = env::var("REDIS_HOST").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
    let client = Client::open(url.as_str()).map_err(|e| anyhow!("Redis 地址无效 {}: {}", url, e))?;
    client.get_multiplexed_async_connection().await.map_err(|e| {
        error!("状态存储 Redis 连接失败: {}", url);
        anyhow!("Redis 连接失败: {}", e)
    })?;
    // 并发初始化时保留先写入的客户端
    let _ = STATE_CLIENT.set(client);
    info!("状态存储 Redis 已就绪: {}", url);
    Ok(())
}

/// 取一条多路复用连接，未初始化时报错
pub async fn get_redis_connection() -> Result<MultiplexedConnection> {
    let client = STATE_CLIENT
        .get()
        .ok_or_else(|| anyhow!("状态存储 Redis 未初始化"))?;
    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| anyhow!("获取 Redis 连接失败: {}", e))
}

/// 多路复用连接随客户端一起释放，这里只记录关闭
pub async fn cleanup_redis_pool() -> Result<()> {
    if STATE_CLIENT.get().is_some() {
        info!("状态存储 Redis 已释放");
    }
    Ok(())
}

/// 治理状态记录的完整键，例如 `sniper:state:discipline_state`
pub fn state_key(name: &str) -> String {
    format!("{}{}", STATE_KEY_PREFIX, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_key() {
        assert_eq!(state_key("trade_ledger"), "sniper:state:trade_ledger");
    }

    #[tokio::test]
    async fn test_connection_requires_init() {
        if STATE_CLIENT.get().is_none() {
            assert!(get_redis_connection().await.is_err());
        }
    }
}
