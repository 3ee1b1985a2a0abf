//! Symbol universe for multi-symbol runs.
//!
//! Parses symbol lists from configuration and loads a candle series for each.
//! Symbols without data are skipped with a warning; the run only fails when
//! nothing loads.

use crate::domain::error::QuantflowError;
use crate::domain::ohlcv::Series;
use crate::ports::data_port::DataPort;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct Universe {
    pub series: HashMap<String, Series>,
    pub skipped: Vec<SkippedSymbol>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.series.len()
    }

    /// Loaded symbols in sorted order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.series.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
) -> Result<Universe, QuantflowError> {
    let mut series = HashMap::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let reason = match data_port.fetch_candles(symbol) {
            Ok(s) if s.is_empty() => "no candles".to_string(),
            Ok(s) => {
                info!(symbol = %symbol, candles = s.len(), "loaded candles");
                series.insert(symbol.clone(), s);
                continue;
            }
            Err(e) => e.to_string(),
        };
        warn!(symbol = %symbol, %reason, "skipping symbol");
        skipped.push(SkippedSymbol {
            symbol: symbol.clone(),
            reason,
        });
    }

    if series.is_empty() {
        return Err(QuantflowError::NoData {
            symbol: symbols.join(","),
        });
    }

    if !skipped.is_empty() {
        info!(
            loaded = series.len(),
            requested = symbols.len(),
            "running on a partial universe"
        );
    }

    Ok(Universe { series, skipped })
}
