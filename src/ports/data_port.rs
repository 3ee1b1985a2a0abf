//! Candle data access port.

use crate::domain::error::QuantflowError;
use crate::domain::ohlcv::Series;

pub trait DataPort {
    /// Full candle history for `symbol`, ascending by timestamp.
    fn fetch_candles(&self, symbol: &str) -> Result<Series, QuantflowError>;

    fn list_symbols(&self) -> Result<Vec<String>, QuantflowError>;
}
