//! 定时任务

mod signal_job;

pub use signal_job::{register_signal_jobs, run_signal_job, SignalJobSummary};
