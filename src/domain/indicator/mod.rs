//! Technical indicators over numeric series.
//!
//! Every indicator is a pure function returning a series aligned index-for-index
//! with its input. Indices without enough history hold [`f64::NAN`]. Nothing is
//! cached between calls: callers recompute over whatever window they hold, and
//! because every indicator only looks backwards, the value at index `i` is the
//! same whether computed over `values[..=i]` or a longer series.

pub mod atr;
pub mod cross;
pub mod ema;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod wma;

pub use atr::atr;
pub use cross::{crossover, crossunder};
pub use ema::ema;
pub use roc::roc;
pub use rsi::rsi;
pub use sma::sma;
pub use stddev::stdev;
pub use wma::wma;

/// A series of `len` undefined values.
pub(crate) fn undefined(len: usize) -> Vec<f64> {
    vec![f64::NAN; len]
}
