use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// 关闭回调函数
pub type ShutdownHook =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

struct NamedHook {
    name: String,
    hook: ShutdownHook,
}

/// 关闭配置
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// 总超时时间
    pub total_timeout: Duration,
    /// 每个钩子的超时时间
    pub hook_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(30),
            hook_timeout: Duration::from_secs(10),
        }
    }
}

/// 优雅停止管理器
///
/// 按注册顺序执行回调（例如：停止调度器、刷写治理状态、清理 Redis），
/// 单个回调失败或超时不会中断后续回调。
pub struct ShutdownManager {
    is_shutting_down: Arc<AtomicBool>,
    hooks: RwLock<Vec<NamedHook>>,
    config: ShutdownConfig,
}

impl ShutdownManager {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            is_shutting_down: Arc::new(AtomicBool::new(false)),
            hooks: RwLock::new(Vec::new()),
            config,
        }
    }

    pub fn new_default() -> Self {
        Self::new(ShutdownConfig::default())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Acquire)
    }

    /// 关闭标志的共享引用，供长循环任务检查
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.is_shutting_down.clone()
    }

    /// 注册关闭回调
    pub async fn register_shutdown_hook<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let boxed: ShutdownHook = Box::new(move || Box::pin(hook()));
        info!("注册关闭回调: {}", name);
        self.hooks.write().await.push(NamedHook { name, hook: boxed });
    }

    /// 执行优雅关闭，重复调用只执行一次
    pub async fn shutdown(&self) -> Result<()> {
        if self
            .is_shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("关闭已在进行中");
            return Ok(());
        }

        info!("开始执行优雅关闭，总超时: {:?}", self.config.total_timeout);
        let start_time = Instant::now();

        match tokio::time::timeout(self.config.total_timeout, self.execute_hooks()).await {
            Ok(()) => {
                info!("优雅关闭完成，耗时: {:?}", start_time.elapsed());
                Ok(())
            }
            Err(_) => {
                error!("关闭超时 ({:?})", self.config.total_timeout);
                Err(anyhow::anyhow!("关闭超时"))
            }
        }
    }

    async fn execute_hooks(&self) {
        let hooks = self.hooks.read().await;
        let hook_count = hooks.len();
        if hook_count == 0 {
            info!("没有注册的关闭回调");
            return;
        }

        for (index, named) in hooks.iter().enumerate() {
            let hook_start = Instant::now();
            match tokio::time::timeout(self.config.hook_timeout, (named.hook)()).await {
                Ok(Ok(())) => info!(
                    "关闭回调 {}/{} [{}] 完成，耗时: {:?}",
                    index + 1,
                    hook_count,
                    named.name,
                    hook_start.elapsed()
                ),
                Ok(Err(e)) => error!(
                    "关闭回调 {}/{} [{}] 失败: {}",
                    index + 1,
                    hook_count,
                    named.name,
                    e
                ),
                Err(_) => error!(
                    "关闭回调 {}/{} [{}] 超时 ({:?})",
                    index + 1,
                    hook_count,
                    named.name,
                    self.config.hook_timeout
                ),
            }
        }
    }

    /// 等待系统关闭信号，返回信号名称
    pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            Ok(name)
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok("CTRL+C")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_shutdown_runs_hooks_once() {
        let config = ShutdownConfig {
            total_timeout: Duration::from_secs(5),
            hook_timeout: Duration::from_secs(2),
        };
        let manager = ShutdownManager::new(config);
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        manager
            .register_shutdown_hook("flush_state", move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;
        manager
            .register_shutdown_hook("failing", || async { Err(anyhow::anyhow!("boom")) })
            .await;

        assert!(manager.shutdown().await.is_ok());
        assert!(manager.is_shutting_down());
        assert!(manager.shutdown().await.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_hook_times_out_without_blocking_others() {
        let manager = ShutdownManager::new(ShutdownConfig {
            total_timeout: Duration::from_secs(5),
            hook_timeout: Duration::from_millis(50),
        });
        let ran = Arc::new(AtomicBool::new(false));
        manager
            .register_shutdown_hook("slow", || async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok(())
            })
            .await;
        let r = ran.clone();
        manager
            .register_shutdown_hook("after_slow", move || {
                let r = r.clone();
                async move {
                    r.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;
        assert!(manager.shutdown().await.is_ok());
        assert!(ran.load(Ordering::SeqCst));
    }
}
