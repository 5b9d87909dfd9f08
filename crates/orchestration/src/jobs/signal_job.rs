use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use sniper_services::{SignalOutcome, SignalService, SignalTarget};

use crate::scheduler::TaskScheduler;

/// 缓存清理周期
const CACHE_PURGE_INTERVAL_MS: u64 = 300_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalJobSummary {
    pub emitted: usize,
    pub cached: usize,
    pub withheld: usize,
    pub no_data: usize,
    pub failed: usize,
}

impl SignalJobSummary {
    pub fn record(&mut self, result: &Result<SignalOutcome>) {
        match result {
            Ok(SignalOutcome::Emitted(_)) => self.emitted += 1,
            Ok(SignalOutcome::Cached(_)) => self.cached += 1,
            Ok(SignalOutcome::Withheld(_)) => self.withheld += 1,
            Ok(SignalOutcome::NoData) => self.no_data += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// 对全部目标跑一轮流水线
pub async fn run_signal_job(service: &SignalService, targets: &[SignalTarget]) -> SignalJobSummary {
    let mut summary = SignalJobSummary::default();
    for (target, result) in service.generate_batch(targets).await {
        if let Err(e) = &result {
            error!("信号任务 {} 执行失败: {:#}", target, e);
        }
        summary.record(&result);
    }
    info!(
        "信号任务完成: emitted={} cached={} withheld={} no_data={} failed={}",
        summary.emitted, summary.cached, summary.withheld, summary.no_data, summary.failed
    );
    summary
}

/// 注册信号任务与缓存清理任务
pub fn register_signal_jobs(
    scheduler: &mut TaskScheduler,
    service: Arc<SignalService>,
    targets: Vec<SignalTarget>,
    interval_ms: u64,
) -> Result<()> {
    let targets = Arc::new(targets);
    let signal_service = service.clone();
    scheduler.add_periodic_task("signal_job", interval_ms, move || {
        let service = signal_service.clone();
        let targets = targets.clone();
        async move {
            run_signal_job(&service, &targets).await;
        }
    })?;

    scheduler.add_periodic_task("signal_cache_purge", CACHE_PURGE_INTERVAL_MS, move || {
        let service = service.clone();
        async move {
            service.purge_cache();
        }
    })?;
    Ok(())
}
