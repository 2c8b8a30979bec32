use crate::models::{DailyPriceSet, DayPrices, HOURS_PER_DAY};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One hourly record of the `elspotprices` feed. Prices are DKK/MWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    #[serde(rename = "HourDK")]
    pub hour_dk: NaiveDateTime,
    #[serde(rename = "PriceArea")]
    pub price_area: String,
    #[serde(rename = "SpotPriceDKK")]
    pub spot_price_dkk: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    records: Vec<SpotRecord>,
}

/// CSV exports may use `;` and decimal commas, so prices are read as text first.
#[derive(Debug, Deserialize)]
struct CsvSpotRecord {
    #[serde(rename = "HourDK")]
    hour_dk: String,
    #[serde(rename = "PriceArea")]
    price_area: String,
    #[serde(rename = "SpotPriceDKK")]
    spot_price_dkk: Option<String>,
}

impl CsvSpotRecord {
    fn into_record(self) -> Result<SpotRecord> {
        let hour_dk = parse_hour_dk(&self.hour_dk)?;
        let spot_price_dkk = match self.spot_price_dkk.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => {
                let price = parse_price(text)?;
                if price.is_finite() {
                    Some(price)
                } else {
                    warn!(
                        "Non-finite SpotPriceDKK '{}' at {}, treating hour as missing",
                        text, hour_dk
                    );
                    None
                }
            }
        };
        Ok(SpotRecord {
            hour_dk,
            price_area: self.price_area.trim().to_string(),
            spot_price_dkk,
        })
    }
}

/// Accepts `1234.56`, `1234,56`, `1.234,56` and `1,234.56`. When both separators
/// appear, the last one is the decimal mark.
fn parse_price(text: &str) -> Result<f64> {
    let normalized = match (text.rfind(','), text.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => text.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => text.replace(',', ""),
        (Some(_), None) => text.replace(',', "."),
        _ => text.to_string(),
    };
    normalized
        .parse::<f64>()
        .with_context(|| format!("Invalid SpotPriceDKK '{}'", text))
}

fn parse_hour_dk(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M"))
        .with_context(|| format!("Invalid HourDK '{}'", text))
}

/// Feed prices are per MWh; everything downstream works per kWh.
pub fn spot_per_kwh(dkk_per_mwh: f64) -> f64 {
    dkk_per_mwh / 1000.0
}

pub struct DataLoader {
    area: Option<String>,
}

impl DataLoader {
    /// `area` restricts records to one price area; `None` accepts all.
    pub fn new(area: Option<String>) -> Self {
        Self { area }
    }

    pub fn for_area(area: &str) -> Self {
        Self::new(Some(area.to_string()))
    }

    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    /// Load a feed export, picking the format from the file extension.
    pub fn load_records<P: AsRef<Path>>(&self, path: P) -> Result<Vec<SpotRecord>> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => self.load_json(path),
            Some("csv") => self.load_csv(path),
            _ => anyhow::bail!("Unsupported feed file {:?} (expected .json or .csv)", path),
        }
    }

    pub fn load_json(&self, path: &Path) -> Result<Vec<SpotRecord>> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        self.parse_json(&json)
            .with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Accepts either the API response (`{"records": [...]}`) or a bare array.
    pub fn parse_json(&self, json: &str) -> Result<Vec<SpotRecord>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let records = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            serde_json::from_value::<FeedResponse>(value)?.records
        };
        Ok(records)
    }

    pub fn load_csv(&self, path: &Path) -> Result<Vec<SpotRecord>> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        self.parse_csv(&text)
            .with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn parse_csv(&self, text: &str) -> Result<Vec<SpotRecord>> {
        let header = text.lines().next().unwrap_or_default();
        let delimiter = if header.contains(';') { b';' } else { b',' };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<CsvSpotRecord>().enumerate() {
            let record = row
                .map_err(anyhow::Error::from)
                .and_then(CsvSpotRecord::into_record)
                .with_context(|| format!("Bad record on data line {}", line + 1))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Dates present in `records` for this loader's area, ascending.
    pub fn dates(&self, records: &[SpotRecord]) -> Vec<NaiveDate> {
        records
            .iter()
            .filter(|r| self.accepts_area(&r.price_area))
            .map(|r| r.hour_dk.date())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Build the 24 slots for `date`. Returns `None` when no record matches at all.
    ///
    /// Only whole-hour records count. For a repeated hour (DST fall-back) the first
    /// record wins; a record without a price leaves its slot empty.
    pub fn daily_prices(&self, records: &[SpotRecord], date: NaiveDate) -> Option<DayPrices> {
        let mut slots = [None; HOURS_PER_DAY];
        let mut seen = [false; HOURS_PER_DAY];
        let mut area = None;

        for record in records
            .iter()
            .filter(|r| r.hour_dk.date() == date && self.accepts_area(&r.price_area))
        {
            area.get_or_insert_with(|| record.price_area.clone());

            if record.hour_dk.minute() != 0 || record.hour_dk.second() != 0 {
                debug!("Ignoring sub-hourly record at {}", record.hour_dk);
                continue;
            }

            let hour = record.hour_dk.hour() as usize;
            if seen[hour] {
                warn!(
                    "Duplicate record for {} {}:00 in {}, keeping the first",
                    date, hour, record.price_area
                );
                continue;
            }
            seen[hour] = true;
            slots[hour] = record
                .spot_price_dkk
                .filter(|price| price.is_finite())
                .map(spot_per_kwh);
        }

        let area = area?;
        let prices = DailyPriceSet::new(slots);
        if !prices.is_complete() {
            debug!(
                "{} {}: {} of {} hours have prices",
                date,
                area,
                prices.present_count(),
                HOURS_PER_DAY
            );
        }

        Some(DayPrices { date, area, prices })
    }

    fn accepts_area(&self, area: &str) -> bool {
        self.area
            .as_deref()
            .map_or(true, |wanted| wanted.eq_ignore_ascii_case(area))
    }
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::for_area("DK1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Hour;
    use std::io::Write;

    const FEED_JSON: &str = r#"{
        "total": 5,
        "records": [
            {"HourUTC": "2024-01-14T23:00:00", "HourDK": "2024-01-15T00:00:00", "PriceArea": "DK1", "SpotPriceDKK": 523.12, "SpotPriceEUR": 70.1},
            {"HourUTC": "2024-01-15T00:00:00", "HourDK": "2024-01-15T01:00:00", "PriceArea": "DK1", "SpotPriceDKK": -12.5, "SpotPriceEUR": -1.7},
            {"HourUTC": "2024-01-15T01:00:00", "HourDK": "2024-01-15T02:00:00", "PriceArea": "DK1", "SpotPriceDKK": null, "SpotPriceEUR": null},
            {"HourUTC": "2024-01-14T23:00:00", "HourDK": "2024-01-15T00:00:00", "PriceArea": "DK2", "SpotPriceDKK": 900.0, "SpotPriceEUR": 120.0},
            {"HourUTC": "2024-01-15T23:00:00", "HourDK": "2024-01-16T00:00:00", "PriceArea": "DK1", "SpotPriceDKK": 100.0, "SpotPriceEUR": 13.4}
        ]
    }"#;

    fn hour(h: u8) -> Hour {
        Hour::new(h).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_json_feed() {
        let loader = DataLoader::for_area("DK1");
        let records = loader.parse_json(FEED_JSON).unwrap();
        assert_eq!(records.len(), 5);

        let day = loader.daily_prices(&records, date("2024-01-15")).unwrap();
        assert_eq!(day.area, "DK1");
        assert!((day.prices.get(hour(0)).unwrap() - 0.52312).abs() < 1e-12);
        assert!((day.prices.get(hour(1)).unwrap() + 0.0125).abs() < 1e-12);
        assert_eq!(day.prices.get(hour(2)), None);
        assert_eq!(day.prices.present_count(), 2);
    }

    #[test]
    fn test_area_filter() {
        let records = DataLoader::default().parse_json(FEED_JSON).unwrap();

        let dk2 = DataLoader::for_area("dk2")
            .daily_prices(&records, date("2024-01-15"))
            .unwrap();
        assert_eq!(dk2.area, "DK2");
        assert_eq!(dk2.prices.get(hour(0)), Some(0.9));

        let loader = DataLoader::for_area("DK1");
        assert_eq!(
            loader.dates(&records),
            vec![date("2024-01-15"), date("2024-01-16")]
        );
    }

    #[test]
    fn test_no_records_for_date() {
        let loader = DataLoader::for_area("DK1");
        let records = loader.parse_json(FEED_JSON).unwrap();
        assert!(loader.daily_prices(&records, date("2024-02-01")).is_none());
        assert!(DataLoader::for_area("SE3")
            .daily_prices(&records, date("2024-01-15"))
            .is_none());
    }

    #[test]
    fn test_bare_array_json() {
        let json = r#"[{"HourDK": "2024-03-31T05:00:00", "PriceArea": "DK1", "SpotPriceDKK": 250.0}]"#;
        let loader = DataLoader::default();
        let records = loader.parse_json(json).unwrap();
        let day = loader.daily_prices(&records, date("2024-03-31")).unwrap();
        assert_eq!(day.prices.get(hour(5)), Some(0.25));
    }

    #[test]
    fn test_duplicate_hour_keeps_first() {
        let loader = DataLoader::default();
        let records = vec![
            SpotRecord {
                hour_dk: date("2023-10-29").and_hms_opt(2, 0, 0).unwrap(),
                price_area: "DK1".to_string(),
                spot_price_dkk: Some(300.0),
            },
            SpotRecord {
                hour_dk: date("2023-10-29").and_hms_opt(2, 0, 0).unwrap(),
                price_area: "DK1".to_string(),
                spot_price_dkk: Some(700.0),
            },
            SpotRecord {
                hour_dk: date("2023-10-29").and_hms_opt(3, 15, 0).unwrap(),
                price_area: "DK1".to_string(),
                spot_price_dkk: Some(900.0),
            },
        ];

        let day = loader.daily_prices(&records, date("2023-10-29")).unwrap();
        assert_eq!(day.prices.get(hour(2)), Some(0.3));
        assert_eq!(day.prices.get(hour(3)), None);
    }

    #[test]
    fn test_parse_semicolon_csv() {
        let csv = "HourUTC;HourDK;PriceArea;SpotPriceDKK;SpotPriceEUR\n\
                   2024-01-14 23:00;2024-01-15 00:00;DK1;523,12;70,1\n\
                   2024-01-15 00:00;2024-01-15 01:00;DK1;;\n";
        let loader = DataLoader::default();
        let records = loader.parse_csv(csv).unwrap();
        assert_eq!(records.len(), 2);

        let day = loader.daily_prices(&records, date("2024-01-15")).unwrap();
        assert!((day.prices.get(hour(0)).unwrap() - 0.52312).abs() < 1e-12);
        assert_eq!(day.prices.get(hour(1)), None);
    }

    #[test]
    fn test_parse_comma_csv() {
        let csv = "HourDK,PriceArea,SpotPriceDKK\n2024-01-15T07:00:00,DK1,1250.5\n";
        let records = DataLoader::default().parse_csv(csv).unwrap();
        assert_eq!(records[0].hour_dk.hour(), 7);
        assert_eq!(records[0].spot_price_dkk, Some(1250.5));
    }

    #[test]
    fn test_non_finite_csv_prices_are_missing() {
        let mut csv = String::from("HourDK,PriceArea,SpotPriceDKK\n");
        for h in 0..24 {
            let price = match h {
                12 => "NaN".to_string(),
                13 => "inf".to_string(),
                14 => "-inf".to_string(),
                _ => "100".to_string(),
            };
            csv.push_str(&format!("2024-01-15T{:02}:00:00,DK1,{}\n", h, price));
        }
        let loader = DataLoader::default();
        let records = loader.parse_csv(&csv).unwrap();
        assert_eq!(records[12].spot_price_dkk, None);
        assert_eq!(records[13].spot_price_dkk, None);

        let day = loader.daily_prices(&records, date("2024-01-15")).unwrap();
        assert_eq!(day.prices.present_count(), 21);

        let best = crate::WindowOptimizer::default()
            .best_window(&day.prices, 1)
            .unwrap();
        assert_eq!(best.start, hour(0));
    }

    #[test]
    fn test_non_finite_record_is_missing() {
        let records = vec![SpotRecord {
            hour_dk: date("2024-01-15").and_hms_opt(12, 0, 0).unwrap(),
            price_area: "DK1".to_string(),
            spot_price_dkk: Some(f64::NAN),
        }];
        let day = DataLoader::default()
            .daily_prices(&records, date("2024-01-15"))
            .unwrap();
        assert!(day.prices.is_empty());
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_price("1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_price("1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_price("-1.234,5").unwrap(), -1234.5);
        assert_eq!(parse_price("523,12").unwrap(), 523.12);
        assert_eq!(parse_price("523.12").unwrap(), 523.12);
        assert!(parse_price("12,3,4").is_err());

        let csv = "HourDK;PriceArea;SpotPriceDKK\n2024-01-15 07:00;DK1;1.234,56\n";
        let records = DataLoader::default().parse_csv(csv).unwrap();
        assert_eq!(records[0].spot_price_dkk, Some(1234.56));
    }

    #[test]
    fn test_bad_csv_reports_error() {
        let csv = "HourDK,PriceArea,SpotPriceDKK\nyesterday,DK1,10\n";
        assert!(DataLoader::default().parse_csv(csv).is_err());
    }

    #[test]
    fn test_load_records_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("feed.json");
        let mut file = std::fs::File::create(&json_path).unwrap();
        file.write_all(FEED_JSON.as_bytes()).unwrap();

        let loader = DataLoader::default();
        assert_eq!(loader.load_records(&json_path).unwrap().len(), 5);
        assert!(loader.load_records(dir.path().join("feed.txt")).is_err());
    }
}
