use crate::error::{PriceError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HOURS_PER_DAY: usize = 24;

/// One hour-of-day slot, always within 0..=23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Hour(u8);

impl Hour {
    pub const MIDNIGHT: Hour = Hour(0);

    pub fn new(hour: u8) -> Result<Self> {
        if (hour as usize) < HOURS_PER_DAY {
            Ok(Self(hour))
        } else {
            Err(PriceError::InvalidHour(hour as u32))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// All 24 hours in ascending order.
    pub fn all() -> impl Iterator<Item = Hour> {
        (0..HOURS_PER_DAY as u8).map(Hour)
    }

    /// Display label, e.g. `7:00`.
    pub fn label(self) -> String {
        format!("{}:00", self.0)
    }
}

impl TryFrom<u8> for Hour {
    type Error = PriceError;

    fn try_from(hour: u8) -> Result<Self> {
        Hour::new(hour)
    }
}

impl TryFrom<u32> for Hour {
    type Error = PriceError;

    fn try_from(hour: u32) -> Result<Self> {
        u8::try_from(hour)
            .map_err(|_| PriceError::InvalidHour(hour))
            .and_then(Hour::new)
    }
}

impl From<Hour> for u8 {
    fn from(hour: Hour) -> u8 {
        hour.0
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:00", self.0)
    }
}

/// Spot prices (currency per kWh) for the 24 hours of one day.
///
/// `None` marks an hour the feed had no record for. Such hours are skipped when
/// rendering and never take part in a window; they are not treated as zero.
/// Non-finite prices (NaN, infinities) are stored as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPriceSet {
    slots: [Option<f64>; HOURS_PER_DAY],
}

impl DailyPriceSet {
    pub fn new(slots: [Option<f64>; HOURS_PER_DAY]) -> Self {
        Self {
            slots: slots.map(|slot| slot.filter(|spot| spot.is_finite())),
        }
    }

    pub fn empty() -> Self {
        Self::new([None; HOURS_PER_DAY])
    }

    /// Same spot price for every hour.
    pub fn uniform(spot: f64) -> Self {
        Self::new([Some(spot); HOURS_PER_DAY])
    }

    pub fn from_slots(slots: &[Option<f64>]) -> Result<Self> {
        let slots: [Option<f64>; HOURS_PER_DAY] =
            slots.try_into().map_err(|_| PriceError::SlotCount {
                expected: HOURS_PER_DAY,
                actual: slots.len(),
            })?;
        Ok(Self::new(slots))
    }

    /// Fully-present day from plain prices.
    pub fn from_prices(prices: &[f64]) -> Result<Self> {
        let slots: Vec<Option<f64>> = prices.iter().copied().map(Some).collect();
        Self::from_slots(&slots)
    }

    pub fn get(&self, hour: Hour) -> Option<f64> {
        self.slots[hour.index()]
    }

    pub fn slots(&self) -> &[Option<f64>; HOURS_PER_DAY] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = (Hour, Option<f64>)> + '_ {
        Hour::all().zip(self.slots.iter().copied())
    }

    /// Hours that have a spot price, in order.
    pub fn present(&self) -> impl Iterator<Item = (Hour, f64)> + '_ {
        self.iter().filter_map(|(hour, spot)| spot.map(|s| (hour, s)))
    }

    pub fn missing_hours(&self) -> Vec<Hour> {
        self.iter()
            .filter(|(_, spot)| spot.is_none())
            .map(|(hour, _)| hour)
            .collect()
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.present_count() == HOURS_PER_DAY
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBand {
    Low,
    Medium,
    High,
}

impl ColorBand {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorBand::Low => "low",
            ColorBand::Medium => "medium",
            ColorBand::High => "high",
        }
    }
}

impl fmt::Display for ColorBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered row: final consumer price and its colour band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricedHour {
    pub hour: Hour,
    pub price: f64,
    pub band: ColorBand,
}

/// A contiguous window `[start, start + duration)` and its total final price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowCost {
    pub start: Hour,
    pub duration: usize,
    pub total: f64,
}

impl WindowCost {
    /// Exclusive end hour; may be 24.
    pub fn end(&self) -> usize {
        self.start.index() + self.duration
    }

    pub fn hours(&self) -> std::ops::Range<usize> {
        self.start.index()..self.end()
    }

    pub fn total_label(&self) -> String {
        format!("{:.2}", self.total)
    }
}

/// Spot prices of one date and price area as read from a feed export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPrices {
    pub date: NaiveDate,
    pub area: String,
    pub prices: DailyPriceSet,
}

/// Everything the display side needs for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub area: String,
    pub hours: Vec<PricedHour>,
    pub missing_hours: Vec<Hour>,
    pub best_window: Option<WindowCost>,
    /// Window priced from a user-chosen start hour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_window: Option<WindowCost>,
    /// Why the chosen start could not be priced, e.g. a missing hour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_window_error: Option<String>,
}
