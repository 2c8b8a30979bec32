use anyhow::Result;
use clap::Parser;
use log::info;
use price_window::{PriceCalculator, PricingConfig};
use std::path::PathBuf;

mod report_processor;

use report_processor::ReportProcessor;

#[derive(Parser)]
#[command(name = "spot_price_processor")]
#[command(about = "Render daily consumer price tables and cheapest windows from spot feed exports")]
struct Args {
    /// Directory with .csv / .json exports of the elspotprices feed
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Directory for prices_<date>.csv and best_windows.csv
    #[arg(short, long, default_value = "price_reports")]
    output_dir: PathBuf,

    /// Price area to read from the feed
    #[arg(short, long, default_value = "DK1")]
    area: String,

    /// Length of the consumption window in hours
    #[arg(short, long, default_value = "3")]
    duration: usize,

    /// JSON file overriding the built-in pricing constants
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("⚡ Spot Price Report Processor");
    println!("Using {} CPU cores", num_cpus::get());
    println!("Rayon thread pool configured with {} threads", rayon::current_num_threads());
    println!("{}", "=".repeat(60));

    let config = PricingConfig::load(args.config.as_deref())?;
    info!(
        "Fixed costs {:.3} DKK/kWh, VAT x{}",
        config.fixed_costs.total(),
        config.vat_multiplier
    );

    let processor = ReportProcessor::new(
        args.input_dir,
        args.output_dir.clone(),
        &args.area,
        PriceCalculator::new(config),
        args.duration,
    );

    let start = std::time::Instant::now();
    let summary = processor.process_all()?;
    let elapsed = start.elapsed();

    println!("\n📊 Summary:");
    println!("📁 Feed files: {}", summary.files_read);
    println!("✅ Days rendered: {}", summary.days_written);
    println!("⚠️  Days without a {} h window: {}", args.duration, summary.days_without_window);
    println!("\n🎉 Processing complete in {:?}!", elapsed);
    println!("📁 Output directory: {}", args.output_dir.display());

    Ok(())
}
