use crate::calculator::{check_window, from_cents, to_cents, PriceCalculator};
use crate::error::{PriceError, Result};
use crate::models::{DailyPriceSet, DayPrices, DayReport, Hour, WindowCost, HOURS_PER_DAY};
use log::{debug, info};

/// Finds the cheapest contiguous consumption window within one day.
#[derive(Debug, Clone, Default)]
pub struct WindowOptimizer {
    calculator: PriceCalculator,
}

impl WindowOptimizer {
    pub fn new(calculator: PriceCalculator) -> Self {
        Self { calculator }
    }

    pub fn calculator(&self) -> &PriceCalculator {
        &self.calculator
    }

    /// Brute-force scan over every start in `0..=24 - duration`.
    ///
    /// Windows touching an hour without a spot price are skipped. Among equal totals
    /// the earliest start wins. Fails with `InvalidDuration` for 0, `NoValidWindow`
    /// for more than 24 hours and `NoData` when every candidate has a gap.
    pub fn best_window(&self, prices: &DailyPriceSet, duration: usize) -> Result<WindowCost> {
        check_window(Hour::MIDNIGHT, duration)?;

        let best = self
            .window_totals(prices, duration)
            .into_iter()
            .filter_map(|(start, total)| total.map(|cents| (start, cents)))
            .fold(None, |best: Option<(Hour, i64)>, (start, cents)| match best {
                Some((_, best_cents)) if best_cents <= cents => best,
                _ => Some((start, cents)),
            });

        match best {
            Some((start, cents)) => {
                debug!(
                    "Cheapest {}h window starts at {} ({:.2})",
                    duration,
                    start,
                    from_cents(cents)
                );
                Ok(WindowCost {
                    start,
                    duration,
                    total: from_cents(cents),
                })
            }
            None => Err(PriceError::NoData { duration }),
        }
    }

    /// Priced rows plus the windows asked for, ready to display or serialize.
    ///
    /// A day without a complete `duration`-hour window gets `best_window: None`.
    /// The manual window is priced only when both `manual_start` and `duration`
    /// are given; if that fails the reason lands in `manual_window_error`.
    pub fn day_report(
        &self,
        day: &DayPrices,
        duration: Option<usize>,
        manual_start: Option<u8>,
    ) -> Result<DayReport> {
        let best_window = match duration {
            Some(duration) => match self.best_window(&day.prices, duration) {
                Ok(window) => Some(window),
                Err(e @ (PriceError::NoData { .. } | PriceError::NoValidWindow { .. })) => {
                    info!("{} {}: {}", day.date, day.area, e);
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        let (manual_window, manual_window_error) = match (manual_start, duration) {
            (Some(start), Some(duration)) => {
                match self.calculator.window_cost(&day.prices, start, duration) {
                    Ok(window) => (Some(window), None),
                    Err(e) => (None, Some(e.to_string())),
                }
            }
            _ => (None, None),
        };

        Ok(DayReport {
            date: day.date,
            area: day.area.clone(),
            hours: self.calculator.priced_hours(&day.prices),
            missing_hours: day.prices.missing_hours(),
            best_window,
            manual_window,
            manual_window_error,
        })
    }

    /// Total in cents for every start, `None` where the window has a missing hour.
    fn window_totals(&self, prices: &DailyPriceSet, duration: usize) -> Vec<(Hour, Option<i64>)> {
        let cents: Vec<Option<i64>> = self
            .calculator
            .final_prices(prices)
            .iter()
            .map(|price| price.map(to_cents))
            .collect();

        Hour::all()
            .take(HOURS_PER_DAY + 1 - duration)
            .map(|start| {
                let window = &cents[start.index()..start.index() + duration];
                let total: Option<i64> = window.iter().copied().sum();
                if total.is_none() {
                    debug!("Skipping window at {}: missing hour", start);
                }
                (start, total)
            })
            .collect()
    }
}
