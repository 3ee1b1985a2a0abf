#![allow(dead_code)]

pub use quantflow::domain::ohlcv::{Candle, Series};
use quantflow::domain::error::QuantflowError;
use quantflow::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Series>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, symbol: &str, series: Series) -> Self {
        self.data.insert(symbol.to_string(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candles(&self, symbol: &str) -> Result<Series, QuantflowError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(QuantflowError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, QuantflowError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn make_candle(timestamp: i64, close: f64) -> Candle {
    Candle {
        timestamp,
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// One candle per close, timestamps 1000, 2000, ...
pub fn series_from_closes(closes: &[f64]) -> Series {
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_candle((i as i64 + 1) * 1000, close))
        .collect();
    Series::new(candles).unwrap()
}

/// Closes 102, 106, 108, 110, 113 at timestamps 1000..=5000.
pub fn sample_series() -> Series {
    series_from_closes(&[102.0, 106.0, 108.0, 110.0, 113.0])
}

pub fn generate_series(count: usize, start_price: f64) -> Series {
    let closes: Vec<f64> = (0..count)
        .map(|i| start_price + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1)
        .collect();
    series_from_closes(&closes)
}

pub const SAMPLE_CSV: &str = "timestamp,open,high,low,close,volume\n\
    1000,101,103,100,102,1000\n\
    2000,105,107,104,106,1000\n\
    3000,107,109,106,108,1000\n\
    4000,109,111,108,110,1000\n\
    5000,112,114,111,113,1000\n";

pub const FALLING_CSV: &str = "timestamp,open,high,low,close,volume\n\
    2024-01-01,100,101,98,100,500\n\
    2024-01-02,99,100,96,97,500\n\
    2024-01-03,97,98,93,94,500\n";
