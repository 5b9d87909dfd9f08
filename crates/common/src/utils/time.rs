use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// 当前毫秒时间戳
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// 毫秒时间戳对应的本地日期，非法时间戳回退到当前日期
pub fn local_date_of(ts_ms: i64) -> NaiveDate {
    match Local.timestamp_millis_opt(ts_ms) {
        chrono::LocalResult::Single(dt) => dt.date_naive(),
        chrono::LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        chrono::LocalResult::None => Local::now().date_naive(),
    }
}

/// 毫秒时间戳格式化为本地时间字符串
pub fn mill_time_to_local_string(ts_ms: i64) -> String {
    match DateTime::from_timestamp_millis(ts_ms) {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => ts_ms.to_string(),
    }
}

/// 时钟抽象：治理状态机只通过它读取时间，测试可注入固定时钟
pub trait Clock: Send + Sync + Debug {
    fn now_ms(&self) -> i64;

    fn today(&self) -> NaiveDate {
        local_date_of(self.now_ms())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_ms()
    }
}

/// 手动推进的时钟
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self { now: AtomicI64::new(start_ms) }
    }

    pub fn set(&self, ts_ms: i64) {
        self.now.store(ts_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
