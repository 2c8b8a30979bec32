use anyhow::{Context, Result};
use chrono::NaiveDate;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use price_window::{
    DataLoader, DayPrices, DayReport, PriceCalculator, PriceError, SpotRecord, WindowOptimizer,
};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One row of `prices_<date>.csv`.
#[derive(Debug, Serialize)]
struct PriceRow {
    hour: u8,
    label: String,
    price: String,
    band: &'static str,
}

/// One row of `best_windows.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummaryRow {
    pub date: NaiveDate,
    pub area: String,
    pub duration: usize,
    pub start: Option<String>,
    pub total: Option<String>,
    pub status: &'static str,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessSummary {
    pub files_read: usize,
    pub days_written: usize,
    pub days_without_window: usize,
}

/// Renders every day found in a directory of feed exports.
pub struct ReportProcessor {
    input_dir: PathBuf,
    output_dir: PathBuf,
    loader: DataLoader,
    optimizer: WindowOptimizer,
    duration: usize,
}

impl ReportProcessor {
    pub fn new(
        input_dir: PathBuf,
        output_dir: PathBuf,
        area: &str,
        calculator: PriceCalculator,
        duration: usize,
    ) -> Self {
        Self {
            input_dir,
            output_dir,
            loader: DataLoader::for_area(area),
            optimizer: WindowOptimizer::new(calculator),
            duration,
        }
    }

    pub fn process_all(&self) -> Result<ProcessSummary> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create {:?}", self.output_dir))?;

        let files = self.find_feed_files()?;
        println!("📁 Found {} feed files in {}", files.len(), self.input_dir.display());

        let records: Vec<SpotRecord> = files
            .par_iter()
            .filter_map(|path| match self.loader.load_records(path) {
                Ok(records) => Some(records),
                Err(e) => {
                    warn!("Skipping {:?}: {:#}", path, e);
                    None
                }
            })
            .flatten()
            .collect();

        let dates = self.loader.dates(&records);
        info!("{} records covering {} days", records.len(), dates.len());

        let pb = ProgressBar::new(dates.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")?,
        );

        let mut rows = self.render_days(&records, &dates, &pb);
        pb.finish_with_message("done");

        rows.sort_by_key(|row| row.date);
        self.write_summary(&rows)?;

        Ok(ProcessSummary {
            files_read: files.len(),
            days_written: rows.len(),
            days_without_window: rows.iter().filter(|r| r.status != "ok").count(),
        })
    }

    fn find_feed_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for extension in ["csv", "json"] {
            let pattern = self.input_dir.join(format!("*.{}", extension));
            let pattern = pattern
                .to_str()
                .with_context(|| format!("Non UTF-8 input path {:?}", self.input_dir))?;
            files.extend(glob(pattern)?.filter_map(|entry| entry.ok()));
        }
        files.sort();
        Ok(files)
    }

    /// Render every date in parallel. The bar advances once per date, including
    /// dates that produce no report.
    fn render_days(
        &self,
        records: &[SpotRecord],
        dates: &[NaiveDate],
        pb: &ProgressBar,
    ) -> Vec<WindowSummaryRow> {
        dates
            .par_iter()
            .filter_map(|date| {
                let row = self.render_day(records, *date);
                pb.inc(1);
                pb.set_message(date.to_string());
                row
            })
            .collect()
    }

    fn render_day(&self, records: &[SpotRecord], date: NaiveDate) -> Option<WindowSummaryRow> {
        let day = self.loader.daily_prices(records, date)?;
        match self.process_day(&day) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("Failed to write report for {}: {:#}", date, e);
                None
            }
        }
    }

    /// Build the report for one day and write its price table.
    pub fn build_report(&self, day: &DayPrices) -> Result<(DayReport, &'static str)> {
        let calculator = self.optimizer.calculator();
        let (best_window, status) = match self.optimizer.best_window(&day.prices, self.duration) {
            Ok(window) => (Some(window), "ok"),
            Err(PriceError::NoData { .. }) => (None, "no_data"),
            Err(PriceError::NoValidWindow { .. }) => (None, "no_valid_window"),
            Err(e) => return Err(e.into()),
        };

        let report = DayReport {
            date: day.date,
            area: day.area.clone(),
            hours: calculator.priced_hours(&day.prices),
            missing_hours: day.prices.missing_hours(),
            best_window,
            manual_window: None,
            manual_window_error: None,
        };
        Ok((report, status))
    }

    fn process_day(&self, day: &DayPrices) -> Result<WindowSummaryRow> {
        let (report, status) = self.build_report(day)?;
        let path = self.output_dir.join(format!("prices_{}.csv", report.date));
        write_price_table(&path, &report)?;

        Ok(WindowSummaryRow {
            date: report.date,
            area: report.area,
            duration: self.duration,
            start: report.best_window.map(|w| w.start.label()),
            total: report.best_window.map(|w| w.total_label()),
            status,
        })
    }

    fn write_summary(&self, rows: &[WindowSummaryRow]) -> Result<()> {
        let path = self.output_dir.join("best_windows.csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        println!("✅ Wrote {} day summaries to {}", rows.len(), path.display());
        Ok(())
    }
}

fn write_price_table(path: &Path, report: &DayReport) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    for row in &report.hours {
        writer.serialize(PriceRow {
            hour: row.hour.value(),
            label: row.hour.label(),
            price: format!("{:.2}", row.price),
            band: row.band.as_str(),
        })?;
    }
    writer.flush()?;
    Ok(())
}
