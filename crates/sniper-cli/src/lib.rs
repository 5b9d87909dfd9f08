//! # OTC Sniper CLI
//!
//! 主程序入口：一次性命令（生成信号、导入K线、上报结果、紧急停止）与常驻调度模式

pub mod app;
pub mod commands;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use sniper_core::config::{ShutdownConfig, ShutdownManager};
use sniper_infrastructure::StateBackend;
use sniper_orchestration::{register_signal_jobs, TaskScheduler};
use sniper_services::{SignalService, SniperConfig};

use crate::commands::{Cli, Command};

/// 应用初始化：加载 .env 并设置日志
pub fn app_init() -> Result<()> {
    dotenv().ok();
    sniper_core::logger::setup_logging()?;
    info!("应用初始化完成");
    Ok(())
}

/// 全局调度器，关闭钩子从这里取走
pub static SCHEDULER: Lazy<Mutex<Option<TaskScheduler>>> = Lazy::new(|| Mutex::new(None));

/// 解析命令行并执行
pub async fn run() -> Result<()> {
    execute(Cli::parse()).await
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config = SniperConfig::from_env();
    let redis_backend = config.state_backend == StateBackend::Redis;
    let service = app::bootstrap::build_service(config).await?;

    match cli.command {
        Command::Run => run_service(service, redis_backend).await,
        command => {
            let result = commands::dispatch(&service, command).await;
            if redis_backend {
                if let Err(e) = sniper_core::cache::cleanup_redis_pool().await {
                    error!("清理 Redis 连接池失败: {}", e);
                }
            }
            result
        }
    }
}

/// 常驻模式：注册定时信号任务，收到退出信号后优雅关闭
async fn run_service(service: Arc<SignalService>, redis_backend: bool) -> Result<()> {
    info!("启动 OTC Sniper 调度...");
    let targets = service.config().targets.clone();
    let interval_ms = service.config().job_interval_ms;
    if targets.is_empty() {
        warn!("SNIPER_TARGETS 为空，定时任务不会生成信号");
    }

    let mut scheduler = TaskScheduler::new();
    register_signal_jobs(&mut scheduler, service.clone(), targets.clone(), interval_ms)?;
    info!(
        "信号任务已注册 targets={} interval_ms={}",
        targets
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(","),
        interval_ms
    );
    *SCHEDULER.lock().await = Some(scheduler);

    let signal = ShutdownManager::wait_for_shutdown_signal().await?;
    info!("收到关闭信号: {}", signal);

    graceful_shutdown(GracefulShutdownConfig::default(), service, redis_backend).await
}

/// 优雅关闭配置
#[derive(Debug, Clone)]
pub struct GracefulShutdownConfig {
    pub total_timeout_secs: u64,
    pub scheduler_shutdown_timeout_secs: u64,
    pub state_flush_timeout_secs: u64,
}

impl Default for GracefulShutdownConfig {
    fn default() -> Self {
        Self {
            total_timeout_secs: 30,
            scheduler_shutdown_timeout_secs: 5,
            state_flush_timeout_secs: 5,
        }
    }
}

/// 依次关闭调度器、写回治理状态、释放 Redis
pub async fn graceful_shutdown(
    config: GracefulShutdownConfig,
    service: Arc<SignalService>,
    redis_backend: bool,
) -> Result<()> {
    info!("开始优雅关闭... 总超时: {}秒", config.total_timeout_secs);

    let manager = ShutdownManager::new(ShutdownConfig {
        total_timeout: Duration::from_secs(config.total_timeout_secs),
        hook_timeout: Duration::from_secs(config.total_timeout_secs),
    });

    // 1) 关闭调度器
    let scheduler_secs = config.scheduler_shutdown_timeout_secs;
    manager
        .register_shutdown_hook("scheduler_shutdown", move || async move {
            let dur = Duration::from_secs(scheduler_secs);
            if tokio::time::timeout(dur, shutdown_scheduler()).await.is_err() {
                error!("调度器关闭超时 ({}秒)", scheduler_secs);
            }
            Ok(())
        })
        .await;

    // 2) 写回状态
    let flush_secs = config.state_flush_timeout_secs;
    manager
        .register_shutdown_hook("state_flush", move || {
            let service = service.clone();
            async move {
                let dur = Duration::from_secs(flush_secs);
                match tokio::time::timeout(dur, service.flush_state()).await {
                    Ok(result) => result,
                    Err(_) => {
                        error!("状态写回超时 ({}秒)", flush_secs);
                        Ok(())
                    }
                }
            }
        })
        .await;

    // 3) 关闭 Redis
    if redis_backend {
        manager
            .register_shutdown_hook("redis_cleanup", || async {
                if let Err(e) = sniper_core::cache::cleanup_redis_pool().await {
                    error!("清理 Redis 连接池失败: {}", e);
                }
                Ok(())
            })
            .await;
    }

    manager.shutdown().await
}

async fn shutdown_scheduler() {
    info!("正在关闭调度器...");
    let scheduler = SCHEDULER.lock().await.take();
    match scheduler {
        Some(scheduler) => {
            scheduler.shutdown().await;
            info!("调度器关闭完成");
        }
        None => info!("调度器未初始化，跳过关闭"),
    }
}
