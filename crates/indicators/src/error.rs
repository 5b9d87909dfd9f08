use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Invalid period: {0}, must be greater than 0")]
    InvalidPeriod(usize),

    #[error("Invalid multiplier: {0}, must be finite and greater than 0")]
    InvalidMultiplier(f64),

    #[error("MACD fast period {fast} must be shorter than slow period {slow}")]
    InvalidMacdPeriods { fast: usize, slow: usize },
}

pub(crate) fn check_period(period: usize) -> Result<usize, IndicatorError> {
    if period == 0 {
        Err(IndicatorError::InvalidPeriod(period))
    } else {
        Ok(period)
    }
}
