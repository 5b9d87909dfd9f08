//! # OTC Sniper Market
//!
//! 市场数据：多数据源回退链、OTC K线序列存储、熔断器

pub mod chain;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod provider;
pub mod providers;
pub mod series_store;

pub use chain::{MarketData, MarketDataChain};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use config::MarketConfig;
pub use error::MarketDataError;
pub use provider::MarketDataProvider;
pub use providers::{AlphaVantageProvider, BinanceProvider, OtcFeedProvider, YahooProvider};
pub use series_store::{CandleBatch, CandleSeriesStore, IngestReport};
