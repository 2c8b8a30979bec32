use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, ValueEnum};
use log::info;
use price_window::{DataLoader, DayReport, PriceCalculator, PricingConfig, WindowOptimizer};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "price_window")]
#[command(about = "Hourly consumer electricity prices and the cheapest window of a day")]
struct Args {
    /// Feed export with hourly spot prices (.json or .csv)
    #[arg(short, long)]
    input: PathBuf,

    /// Day to show (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<String>,

    /// Move this many days from --date (negative for earlier days)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    offset_days: i64,

    /// Price area to read from the feed
    #[arg(short, long, default_value = "DK1")]
    area: String,

    /// Length of the consumption window in hours
    #[arg(long)]
    duration: Option<usize>,

    /// Price the window starting at this hour instead of only searching
    #[arg(short, long)]
    start: Option<u8>,

    /// JSON file overriding the built-in pricing constants
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.start.is_some() && args.duration.is_none() {
        anyhow::bail!("--start needs --duration");
    }

    let config = PricingConfig::load(args.config.as_deref())?;
    let optimizer = WindowOptimizer::new(PriceCalculator::new(config));

    let base_date = match &args.date {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")?,
        None => Local::now().date_naive(),
    };
    let date = base_date + Duration::days(args.offset_days);

    let loader = DataLoader::for_area(&args.area);
    let records = loader.load_records(&args.input)?;
    info!("Loaded {} records from {:?}", records.len(), args.input);

    let Some(day) = loader.daily_prices(&records, date) else {
        println!("No data for {}", date);
        return Ok(());
    };

    let report = optimizer.day_report(&day, args.duration, args.start)?;

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
        OutputFormat::Table => print_table(&report, args.duration),
    }

    Ok(())
}

fn print_table(report: &DayReport, duration: Option<usize>) {
    println!("Prices for {} ({})", report.date, report.area);
    println!("{}", "=".repeat(30));
    for row in &report.hours {
        println!("{:>6}  {:>6.2} kr  {}", row.hour.label(), row.price, row.band);
    }
    if !report.missing_hours.is_empty() {
        let missing: Vec<String> = report.missing_hours.iter().map(|h| h.label()).collect();
        println!("No price for: {}", missing.join(", "));
    }

    let Some(duration) = duration else {
        return;
    };
    println!();

    match &report.best_window {
        Some(window) => {
            println!("Cheapest start: {}", window.start.label());
            println!("Total price: {} kr for {} h", window.total_label(), duration);
        }
        None => println!("No {} h window with prices for every hour", duration),
    }

    if let Some(window) = &report.manual_window {
        println!(
            "Price from {}: {} kr",
            window.start.label(),
            window.total_label()
        );
    }
    if let Some(e) = &report.manual_window_error {
        println!("Price from chosen start unavailable: {}", e);
    }
}
