//! ROC (Rate of Change).
//!
//! ROC(n)[i] = ((P[i] - P[i-n]) / P[i-n]) * 100
//! If P[i-n] == 0: ROC = 0
//! Warmup: first n values are undefined.

use super::undefined;

pub fn roc(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = undefined(values.len());
    if period == 0 {
        return result;
    }

    for i in period..values.len() {
        let prev = values[i - period];
        result[i] = if prev == 0.0 {
            0.0
        } else {
            ((values[i] - prev) / prev) * 100.0
        };
    }
    result
}
