use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// 周期任务最小间隔
pub const MIN_INTERVAL_MS: u64 = 100;

pub struct TaskScheduler {
    periodic_tasks: HashMap<String, JoinHandle<()>>,
    scheduled_tasks: HashMap<String, JoinHandle<()>>,
    shutdown_sender: broadcast::Sender<()>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        let (shutdown_sender, _) = broadcast::channel(16);
        Self {
            periodic_tasks: HashMap::new(),
            scheduled_tasks: HashMap::new(),
            shutdown_sender,
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    /// 每 `every_n_millis` 执行一次，首次立即执行；上一轮未结束时跳过错过的节拍
    pub fn add_periodic_task<F, Fut>(&mut self, name: &str, every_n_millis: u64, task_fn: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        if every_n_millis < MIN_INTERVAL_MS {
            bail!("任务 {} 间隔 {}ms 小于最小间隔 {}ms", name, every_n_millis, MIN_INTERVAL_MS);
        }
        if self.periodic_tasks.contains_key(name) {
            bail!("周期任务 {} 已存在", name);
        }

        let mut interval_timer = interval(Duration::from_millis(every_n_millis));
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        debug!("执行周期任务 {}", task_name);
                        task_fn().await;
                    }
                    _ = shutdown_receiver.recv() => {
                        info!("周期任务 {} 已停止", task_name);
                        break;
                    }
                }
            }
        });
        info!("注册周期任务 {} 间隔 {}ms", name, every_n_millis);
        self.periodic_tasks.insert(name.to_string(), handle);
        Ok(())
    }

    /// 在指定时间执行一次
    pub fn add_scheduled_task<F, Fut>(&mut self, name: &str, target_time: DateTime<Utc>, task: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let duration_until_target = (target_time - Utc::now())
            .to_std()
            .map_err(|_| anyhow!("任务 {} 的执行时间 {} 已过去", name, target_time))?;
        let target_instant = Instant::now() + duration_until_target;
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = sleep_until(target_instant) => {
                    task().await;
                }
                _ = shutdown_receiver.recv() => {
                    info!("定时任务 {} 已取消", task_name);
                }
            }
        });
        self.scheduled_tasks.insert(name.to_string(), handle);
        Ok(())
    }

    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .periodic_tasks
            .keys()
            .chain(self.scheduled_tasks.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub async fn shutdown(self) {
        // 发送关闭信号
        let _ = self.shutdown_sender.send(());

        // 等待所有任务完成
        for handle in self.periodic_tasks.into_values() {
            let _ = handle.await;
        }
        for handle in self.scheduled_tasks.into_values() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_periodic_task_runs_until_shutdown() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TaskScheduler::new();
        let c = counter.clone();
        scheduler
            .add_periodic_task("tick", 100, move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        scheduler.shutdown().await;
        let runs = counter.load(Ordering::SeqCst);
        assert!(runs >= 2);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(counter.load(Ordering::SeqCst), runs);
    }

    #[tokio::test]
    async fn test_rejects_bad_registrations() {
        let mut scheduler = TaskScheduler::new();
        assert!(scheduler.add_periodic_task("fast", 10, || async {}).is_err());
        scheduler.add_periodic_task("a", 1_000, || async {}).unwrap();
        assert!(scheduler.add_periodic_task("a", 1_000, || async {}).is_err());
        let past = Utc::now() - chrono::Duration::seconds(5);
        assert!(scheduler.add_scheduled_task("late", past, || async {}).is_err());
        assert_eq!(scheduler.task_names(), vec!["a".to_string()]);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_scheduled_task_fires_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TaskScheduler::new();
        let c = counter.clone();
        let at = Utc::now() + chrono::Duration::milliseconds(50);
        scheduler
            .add_scheduled_task("once", at, move || async move {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        scheduler.shutdown().await;
    }
}
