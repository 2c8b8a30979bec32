use thiserror::Error;

/// Contract violations and "no answer" outcomes of the pricing core.
///
/// A missing hour inside a [`DailyPriceSet`](crate::DailyPriceSet) is not an error by
/// itself; it only surfaces here when a caller asks for a window that needs it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceError {
    #[error("hour {0} is outside 0-23")]
    InvalidHour(u32),

    /// Zero-length windows are rejected; over-long ones are `NoValidWindow`.
    #[error("window duration must be at least 1 hour, got {0}")]
    InvalidDuration(usize),

    #[error("no {duration}-hour window starting at or after {start}:00 fits in a 24-hour day")]
    NoValidWindow { start: u8, duration: usize },

    #[error("no {duration}-hour window has a price for every hour")]
    NoData { duration: usize },

    #[error("no spot price for {0}:00")]
    MissingHour(u8),

    #[error("expected {expected} hourly slots, got {actual}")]
    SlotCount { expected: usize, actual: usize },

    #[error("invalid tariff table: {0}")]
    InvalidTariffTable(String),
}

pub type Result<T> = std::result::Result<T, PriceError>;
