//! # OTC Sniper Orchestration
//!
//! 编排层：定时任务调度与信号任务

pub mod jobs;
pub mod scheduler;

pub use jobs::{register_signal_jobs, run_signal_job, SignalJobSummary};
pub use scheduler::TaskScheduler;
