//! # 应用启动引导
//!
//! 按配置打开状态存储并组装信号服务

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use sniper_services::{SignalService, SniperConfig};

/// 打开状态存储（Redis 后端会先初始化连接池），再从配置构建服务
pub async fn build_service(config: SniperConfig) -> Result<Arc<SignalService>> {
    let store = config
        .state_backend
        .open()
        .await
        .context("打开状态存储失败")?;
    info!(
        "构建信号服务 targets={} llm_configured={} backend={}",
        config.targets.len(),
        config.llm.is_configured(),
        store.backend()
    );
    let service = SignalService::from_config(config, store).await?;
    Ok(Arc::new(service))
}
