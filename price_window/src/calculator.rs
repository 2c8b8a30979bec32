use crate::config::PricingConfig;
use crate::error::{PriceError, Result};
use crate::models::{ColorBand, DailyPriceSet, Hour, PricedHour, WindowCost, HOURS_PER_DAY};

/// Round the exact decimal value of `value` to 2 decimals, halves away from zero.
///
/// Scaling by 100 first would round the product, not the stored value, so 1.5949999...
/// could end up as 1.60. Only multiples of 1/8 can sit exactly on a half cent, and for
/// those the scaled value is exact.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    if (value * 8.0).fract() == 0.0 {
        return (value * 100.0).round() / 100.0;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Final prices are whole cents; summing cents keeps equal windows exactly equal.
pub(crate) fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

pub(crate) fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Validates a window against the 24-hour day.
pub(crate) fn check_window(start: Hour, duration: usize) -> Result<()> {
    if duration == 0 {
        return Err(PriceError::InvalidDuration(duration));
    }
    if start.index() + duration > HOURS_PER_DAY {
        return Err(PriceError::NoValidWindow {
            start: start.value(),
            duration,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct PriceCalculator {
    config: PricingConfig,
}

impl PriceCalculator {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn tariff_for(&self, hour: Hour) -> f64 {
        self.config.tariff.tariff_for(hour)
    }

    /// `round2((spot + fixed costs + tariff) * VAT)`
    pub fn final_price(&self, spot: f64, hour: Hour) -> f64 {
        let pre_vat = spot + self.config.fixed_costs.total() + self.tariff_for(hour);
        round2(pre_vat * self.config.vat_multiplier)
    }

    /// Like [`final_price`](Self::final_price) for an unchecked hour number.
    pub fn final_price_at(&self, spot: f64, hour: u32) -> Result<f64> {
        let hour = Hour::try_from(hour)?;
        Ok(self.final_price(spot, hour))
    }

    pub fn color_band(&self, price: f64) -> ColorBand {
        self.config.color_thresholds.band_for(price)
    }

    /// Final price per hour, `None` where the spot price is missing.
    pub fn final_prices(&self, prices: &DailyPriceSet) -> [Option<f64>; HOURS_PER_DAY] {
        let mut finals = [None; HOURS_PER_DAY];
        for (hour, spot) in prices.present() {
            finals[hour.index()] = Some(self.final_price(spot, hour));
        }
        finals
    }

    /// Rows for display. Hours without a spot price are left out.
    pub fn priced_hours(&self, prices: &DailyPriceSet) -> Vec<PricedHour> {
        prices
            .present()
            .map(|(hour, spot)| {
                let price = self.final_price(spot, hour);
                PricedHour {
                    hour,
                    price,
                    band: self.color_band(price),
                }
            })
            .collect()
    }

    /// Cost of running from `start` for `duration` hours.
    pub fn window_cost(&self, prices: &DailyPriceSet, start: u8, duration: usize) -> Result<WindowCost> {
        let start = Hour::new(start)?;
        check_window(start, duration)?;

        let mut cents = 0i64;
        for hour in Hour::all().skip(start.index()).take(duration) {
            let spot = prices
                .get(hour)
                .ok_or(PriceError::MissingHour(hour.value()))?;
            cents += to_cents(self.final_price(spot, hour));
        }

        Ok(WindowCost {
            start,
            duration,
            total: from_cents(cents),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixedCosts;

    fn hour(h: u8) -> Hour {
        Hour::new(h).unwrap()
    }

    #[test]
    fn test_final_price_day_band() {
        let calculator = PriceCalculator::default();
        // (0.50 + 1.068 + 0.20) * 1.25 = 2.21
        assert_eq!(calculator.final_price(0.50, hour(10)), 2.21);
    }

    #[test]
    fn test_round2_uses_exact_decimal_value() {
        // literals stored as 1.594999..., 1.004999... and 2.834999...
        assert_eq!(round2(1.595), 1.59);
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(2.835), 2.83);
        // exact half cents
        assert_eq!(round2(2.125), 2.13);
        assert_eq!(round2(-2.125), -2.13);
        assert_eq!(round2(0.375), 0.38);
        assert!(round2(f64::NAN).is_nan());
    }

    #[test]
    fn test_final_price_just_below_half_cent() {
        let calculator = PriceCalculator::default();
        // (-0.402 + 1.068 + 0.61) * 1.25 is stored as 1.5949999...
        assert_eq!(calculator.final_price(-0.402, hour(18)), 1.59);
    }

    #[test]
    fn test_final_price_per_band() {
        let calculator = PriceCalculator::default();
        // (1.0 + 1.068 + 0.07) * 1.25 = 2.6725
        assert_eq!(calculator.final_price(1.0, hour(3)), 2.67);
        // (1.0 + 1.068 + 0.61) * 1.25 = 3.3475
        assert_eq!(calculator.final_price(1.0, hour(18)), 3.35);
        // (1.0 + 1.068 + 0.20) * 1.25 = 2.835
        assert_eq!(calculator.final_price(1.0, hour(22)), 2.84);
    }

    #[test]
    fn test_negative_spot_price() {
        let calculator = PriceCalculator::default();
        // (-2.0 + 1.068 + 0.20) * 1.25 = -0.915
        assert_eq!(calculator.final_price(-2.0, hour(12)), -0.92);
        assert_eq!(calculator.color_band(-0.92), ColorBand::Low);
    }

    #[test]
    fn test_final_price_at_rejects_bad_hour() {
        let calculator = PriceCalculator::default();
        assert_eq!(calculator.final_price_at(0.5, 10), Ok(2.21));
        assert_eq!(
            calculator.final_price_at(0.5, 24),
            Err(PriceError::InvalidHour(24))
        );
    }

    #[test]
    fn test_final_price_is_deterministic() {
        let calculator = PriceCalculator::default();
        for h in Hour::all() {
            assert_eq!(
                calculator.final_price(0.4321, h),
                calculator.final_price(0.4321, h)
            );
        }
    }

    #[test]
    fn test_custom_config() {
        let config = PricingConfig {
            fixed_costs: FixedCosts {
                energy_tax: 0.0,
                transmission_tariff: 0.0,
                system_tariff: 0.0,
            },
            vat_multiplier: 1.0,
            ..PricingConfig::dk1()
        };
        let calculator = PriceCalculator::new(config);
        assert_eq!(calculator.final_price(1.0, hour(18)), 1.61);
    }

    #[test]
    fn test_priced_hours_skip_missing() {
        let calculator = PriceCalculator::default();
        let mut slots = [Some(0.5); HOURS_PER_DAY];
        slots[0] = None;
        slots[18] = Some(1.0);
        let day = DailyPriceSet::new(slots);

        let rows = calculator.priced_hours(&day);
        assert_eq!(rows.len(), 23);
        assert_eq!(rows[0].hour, hour(1));
        // (0.5 + 1.068 + 0.07) * 1.25 = 2.0475
        assert_eq!(rows[0].price, 2.05);
        assert_eq!(rows[0].band, ColorBand::Medium);

        let peak = rows.iter().find(|r| r.hour == hour(18)).unwrap();
        assert_eq!(peak.price, 3.35);
        assert_eq!(peak.band, ColorBand::High);

        let finals = calculator.final_prices(&day);
        assert_eq!(finals[0], None);
        assert_eq!(finals[10], Some(2.21));
    }

    #[test]
    fn test_window_cost() {
        let calculator = PriceCalculator::default();
        let day = DailyPriceSet::uniform(0.5);

        let cost = calculator.window_cost(&day, 9, 3).unwrap();
        assert_eq!(cost.start, hour(9));
        assert!((cost.total - 6.63).abs() < 1e-9);
    }

    #[test]
    fn test_window_cost_errors() {
        let calculator = PriceCalculator::default();
        let mut slots = [Some(0.5); HOURS_PER_DAY];
        slots[11] = None;
        let day = DailyPriceSet::new(slots);

        assert_eq!(
            calculator.window_cost(&day, 10, 3),
            Err(PriceError::MissingHour(11))
        );
        assert_eq!(
            calculator.window_cost(&day, 22, 3),
            Err(PriceError::NoValidWindow {
                start: 22,
                duration: 3
            })
        );
        assert_eq!(
            calculator.window_cost(&day, 2, 0),
            Err(PriceError::InvalidDuration(0))
        );
        assert_eq!(
            calculator.window_cost(&day, 24, 1),
            Err(PriceError::InvalidHour(24))
        );
    }
}
