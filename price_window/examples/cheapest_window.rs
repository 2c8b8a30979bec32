use price_window::{DailyPriceSet, PricingConfig, PriceCalculator, WindowOptimizer};

fn main() {
    let optimizer = WindowOptimizer::new(PriceCalculator::new(PricingConfig::dk1()));

    // Spot prices in DKK/kWh for one winter day:
    // cheap night, moderate day, expensive evening, one hour missing from the feed
    let mut slots = [None; 24];
    for (hour, slot) in slots.iter_mut().enumerate() {
        *slot = Some(match hour {
            0..=5 => 0.35,
            17..=20 => 1.45,
            21..=23 => 0.80,
            _ => 0.90,
        });
    }
    slots[3] = None;
    let day = DailyPriceSet::new(slots);

    println!("Hourly prices");
    println!("=============");
    for row in optimizer.calculator().priced_hours(&day) {
        println!("  {:>5}  {:.2} kr  ({})", row.hour.label(), row.price, row.band);
    }
    println!();

    for duration in [1, 2, 4, 8] {
        match optimizer.best_window(&day, duration) {
            Ok(window) => println!(
                "{} h: start {} for {} kr",
                duration,
                window.start.label(),
                window.total_label()
            ),
            Err(e) => println!("{} h: {}", duration, e),
        }
    }
}
