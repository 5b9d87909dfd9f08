//! 具体数据源实现

pub mod alpha_vantage;
pub mod binance;
pub mod otc_feed;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageProvider;
pub use binance::BinanceProvider;
pub use otc_feed::OtcFeedProvider;
pub use yahoo::YahooProvider;

use std::time::Duration;

use reqwest::Client;

/// 外部 HTTP 数据源共用的客户端
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .user_agent("otc-sniper/0.1")
        .build()
        .unwrap_or_else(|_| Client::new())
}
