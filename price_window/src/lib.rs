pub mod calculator;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod tariff;

pub use calculator::PriceCalculator;
pub use config::{ColorThresholds, FixedCosts, PricingConfig};
pub use data_loader::{DataLoader, SpotRecord};
pub use error::{PriceError, Result};
pub use models::{ColorBand, DailyPriceSet, DayPrices, DayReport, Hour, PricedHour, WindowCost};
pub use optimizer::WindowOptimizer;
pub use tariff::{TariffBand, TariffTable};
