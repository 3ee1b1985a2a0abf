//! Exponential Moving Average.
//!
//! k = 2/(n+1), EMA[0] = P[0], EMA[i] = (P[i] - EMA[i-1]) * k + EMA[i-1].
//!
//! Seeded with the first value rather than an SMA of the first n values, so
//! index 0 is always defined. Results must stay reproducible against that
//! seeding; do not switch to the textbook SMA seed.

use super::undefined;

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return undefined(values.len());
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(values.len());
    let mut prev = values[0];
    result.push(prev);

    for &value in &values[1..] {
        prev = (value - prev) * k + prev;
        result.push(prev);
    }
    result
}
