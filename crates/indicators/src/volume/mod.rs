//! 成交量指标

pub mod volume_indicator;

pub use volume_indicator::{VolumeRatioIndicator, VolumeStats};
