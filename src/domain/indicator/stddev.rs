//! Standard deviation.
//!
//! Population standard deviation over a window of n values.
//! STDEV(n)[i] = sqrt(sum((P[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Warmup: first (n-1) values are undefined.

use super::undefined;

pub fn stdev(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = undefined(values.len());
    if period == 0 || values.len() < period {
        return result;
    }

    for (offset, window) in values.windows(period).enumerate() {
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        result[offset + period - 1] = variance.sqrt();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::assert_close;

    #[test]
    fn stdev_warmup() {
        let result = stdev(&[1.0, 2.0, 3.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!(!result[2].is_nan());
    }

    #[test]
    fn stdev_constant_is_zero() {
        let result = stdev(&[4.0; 5], 3);
        for v in &result[2..] {
            assert_close(*v, 0.0);
        }
    }

    #[test]
    fn stdev_population_formula() {
        // mean 5, squared deviations 9,1,1,1,0,0,4,16 → 32/8 = 4
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = stdev(&values, 8);
        assert_close(result[7], 2.0);
    }

    #[test]
    fn stdev_period_one_is_zero() {
        let result = stdev(&[3.0, 9.0], 1);
        assert_close(result[0], 0.0);
        assert_close(result[1], 0.0);
    }
}
