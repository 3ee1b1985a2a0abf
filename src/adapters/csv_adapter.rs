//! CSV file data adapter.
//!
//! Reads `<directory>/<SYMBOL>.csv` with header
//! `timestamp,open,high,low,close,volume`. The timestamp column accepts epoch
//! milliseconds, `YYYY-MM-DD` (midnight UTC) or RFC 3339.

use crate::domain::error::QuantflowError;
use crate::domain::ohlcv::{Candle, Series};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn parse_column(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, QuantflowError> {
    record
        .get(index)
        .ok_or_else(|| QuantflowError::Data {
            reason: format!("missing {name} column"),
        })?
        .trim()
        .parse()
        .map_err(|e| QuantflowError::Data {
            reason: format!("invalid {name} value: {e}"),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_candles(&self, symbol: &str) -> Result<Series, QuantflowError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| QuantflowError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| QuantflowError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;

            let raw_ts = record.get(0).ok_or_else(|| QuantflowError::Data {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| QuantflowError::Data {
                reason: format!("invalid timestamp '{raw_ts}' in {} row {}", path.display(), row + 1),
            })?;

            candles.push(Candle {
                timestamp,
                open: parse_column(&record, 1, "open")?,
                high: parse_column(&record, 2, "high")?,
                low: parse_column(&record, 3, "low")?,
                close: parse_column(&record, 4, "close")?,
                volume: parse_column(&record, 5, "volume")?,
            });
        }

        candles.sort_by_key(|c| c.timestamp);
        Ok(Series::new(candles)?)
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuantflowError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| QuantflowError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| QuantflowError::Data {
                reason: format!("directory entry error: {e}"),
            })?;

            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
