//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(P[i-n+1..=i])
//! Warmup: first (n-1) values are undefined.

use super::undefined;

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = undefined(values.len());
    if period == 0 || values.len() < period {
        return result;
    }

    for (offset, window) in values.windows(period).enumerate() {
        result[offset + period - 1] = window.iter().sum::<f64>() / period as f64;
    }
    result
}
