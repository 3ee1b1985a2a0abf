//! Weighted Moving Average.
//!
//! O(n) sliding window: the weighted sum drops the whole window sum and adds
//! n times the newest value on every step.
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) values are undefined.

use super::undefined;

pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = undefined(values.len());
    if period == 0 || values.len() < period {
        return result;
    }

    let divisor = period as f64 * (period as f64 + 1.0) / 2.0;
    let mut weighted_sum = 0.0;
    let mut window_sum = 0.0;

    for (i, &value) in values.iter().enumerate() {
        if i < period {
            weighted_sum += (i + 1) as f64 * value;
            window_sum += value;
        } else {
            weighted_sum += period as f64 * value - window_sum;
            window_sum += value - values[i - period];
        }

        if i + 1 >= period {
            result[i] = weighted_sum / divisor;
        }
    }
    result
}
