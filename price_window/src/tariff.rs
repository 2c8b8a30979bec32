use crate::error::{PriceError, Result};
use crate::models::{Hour, HOURS_PER_DAY};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A tariff band covers every hour up to and including `upper_hour` that an earlier
/// band has not already claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffBand {
    pub name: Cow<'static, str>,
    pub upper_hour: u8,
    pub rate: f64,
}

impl TariffBand {
    pub const fn new(name: &'static str, upper_hour: u8, rate: f64) -> Self {
        Self {
            name: Cow::Borrowed(name),
            upper_hour,
            rate,
        }
    }
}

/// DK1 grid tariff in DKK/kWh.
pub const DK1_BANDS: [TariffBand; 4] = [
    TariffBand::new("low", 5, 0.07),
    TariffBand::new("day", 16, 0.20),
    TariffBand::new("peak", 20, 0.61),
    TariffBand::new("evening", 23, 0.20),
];

/// Ordered `(upper_hour, rate)` lookup. Bands are cumulative thresholds: hour 0 is in
/// the first band, hour 6 in the first band whose bound is >= 6, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TariffBand>", into = "Vec<TariffBand>")]
pub struct TariffTable {
    bands: Vec<TariffBand>,
}

impl TariffTable {
    /// Bounds must be strictly ascending and the last one must be 23.
    pub fn new(bands: Vec<TariffBand>) -> Result<Self> {
        let last = bands
            .last()
            .ok_or_else(|| PriceError::InvalidTariffTable("no bands".to_string()))?;

        if last.upper_hour as usize != HOURS_PER_DAY - 1 {
            return Err(PriceError::InvalidTariffTable(format!(
                "last band '{}' ends at hour {}, expected 23",
                last.name, last.upper_hour
            )));
        }

        if let Some(pair) = bands.windows(2).find(|w| w[0].upper_hour >= w[1].upper_hour) {
            return Err(PriceError::InvalidTariffTable(format!(
                "band '{}' (<= {}) is not above band '{}' (<= {})",
                pair[1].name, pair[1].upper_hour, pair[0].name, pair[0].upper_hour
            )));
        }

        if let Some(band) = bands.iter().find(|b| !b.rate.is_finite()) {
            return Err(PriceError::InvalidTariffTable(format!(
                "band '{}' has non-finite rate",
                band.name
            )));
        }

        Ok(Self { bands })
    }

    pub fn dk1() -> Self {
        Self {
            bands: DK1_BANDS.to_vec(),
        }
    }

    pub fn bands(&self) -> &[TariffBand] {
        &self.bands
    }

    pub fn band_for(&self, hour: Hour) -> &TariffBand {
        let idx = self
            .bands
            .partition_point(|band| band.upper_hour < hour.value());
        // the last bound is 23, so idx is always in range for a valid Hour
        &self.bands[idx.min(self.bands.len() - 1)]
    }

    pub fn tariff_for(&self, hour: Hour) -> f64 {
        self.band_for(hour).rate
    }
}

impl Default for TariffTable {
    fn default() -> Self {
        Self::dk1()
    }
}

impl TryFrom<Vec<TariffBand>> for TariffTable {
    type Error = PriceError;

    fn try_from(bands: Vec<TariffBand>) -> Result<Self> {
        TariffTable::new(bands)
    }
}

impl From<TariffTable> for Vec<TariffBand> {
    fn from(table: TariffTable) -> Self {
        table.bands
    }
}
