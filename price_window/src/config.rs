use crate::models::ColorBand;
use crate::tariff::TariffTable;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Flat surcharges in DKK/kWh that apply to every hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedCosts {
    pub energy_tax: f64,
    pub transmission_tariff: f64,
    pub system_tariff: f64,
}

impl FixedCosts {
    pub fn total(&self) -> f64 {
        self.energy_tax + self.transmission_tariff + self.system_tariff
    }
}

impl Default for FixedCosts {
    fn default() -> Self {
        Self {
            energy_tax: 0.90,
            transmission_tariff: 0.092,
            system_tariff: 0.076,
        }
    }
}

/// Final-price thresholds for the colour bands. Both comparisons are strict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorThresholds {
    pub high_above: f64,
    pub medium_above: f64,
}

impl ColorThresholds {
    pub fn band_for(&self, price: f64) -> ColorBand {
        if price > self.high_above {
            ColorBand::High
        } else if price > self.medium_above {
            ColorBand::Medium
        } else {
            ColorBand::Low
        }
    }
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            high_above: 2.5,
            medium_above: 1.9,
        }
    }
}

/// All constants that turn a spot price into a consumer price.
///
/// Loaded once at start-up and never changed afterwards. Missing fields in a config
/// file fall back to the DK1 defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub fixed_costs: FixedCosts,
    pub vat_multiplier: f64,
    pub tariff: TariffTable,
    pub color_thresholds: ColorThresholds,
}

impl PricingConfig {
    pub fn dk1() -> Self {
        Self {
            fixed_costs: FixedCosts::default(),
            vat_multiplier: 1.25,
            tariff: TariffTable::dk1(),
            color_thresholds: ColorThresholds::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse pricing config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pricing config {:?}", path))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid pricing config {:?}", path))
    }

    /// Falls back to [`PricingConfig::dk1`] when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                log::info!("Loading pricing config from {:?}", path);
                Self::from_json_file(path)
            }
            None => Ok(Self::dk1()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.vat_multiplier.is_finite() || self.vat_multiplier <= 0.0 {
            anyhow::bail!("vat_multiplier must be positive, got {}", self.vat_multiplier);
        }
        if !self.fixed_costs.total().is_finite() {
            anyhow::bail!("fixed costs must be finite");
        }
        if self.color_thresholds.medium_above > self.color_thresholds.high_above {
            anyhow::bail!(
                "medium threshold {} is above high threshold {}",
                self.color_thresholds.medium_above,
                self.color_thresholds.high_above
            );
        }
        Ok(())
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self::dk1()
    }
}
