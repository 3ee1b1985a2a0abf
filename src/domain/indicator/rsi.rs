//! RSI (Relative Strength Index).
//!
//! Gains and losses are the positive and negative parts of consecutive
//! changes. Their averages are plain SMAs over `period` changes, not Wilder's
//! smoothing.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 50, a neutral default instead of a division by zero.
//!
//! Warmup: index 0 and every index with fewer than period+1 values behind it
//! are undefined.

use super::{sma, undefined};

pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() <= period {
        return undefined(values.len());
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .map(|pair| {
            let change = pair[1] - pair[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let avg_gains = sma(&gains, period);
    let avg_losses = sma(&losses, period);

    let mut result = Vec::with_capacity(values.len());
    result.push(f64::NAN);

    for (&avg_gain, &avg_loss) in avg_gains.iter().zip(&avg_losses) {
        let value = if avg_gain.is_nan() || avg_loss.is_nan() {
            f64::NAN
        } else if avg_loss == 0.0 {
            50.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };
        result.push(value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::assert_close;

    #[test]
    fn rsi_huge_period_is_undefined() {
        let result = rsi(&[1.0, 2.0, 3.0, 4.0], usize::MAX);
        assert_eq!(result.len(), 4);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_insufficient_data() {
        let result = rsi(&[1.0, 2.0, 3.0], 3);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_warmup() {
        let result = rsi(&[1.0, 2.0, 3.0, 2.0, 4.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert!(!result[3].is_nan());
        assert!(!result[4].is_nan());
    }

    #[test]
    fn rsi_known_value() {
        // changes: +1, +1, -1, +2; window at index 3: gains 1,1,0 losses 0,0,1
        // avg_gain = 2/3, avg_loss = 1/3, rs = 2 → 100 - 100/3
        let result = rsi(&[1.0, 2.0, 3.0, 2.0, 4.0], 3);
        assert_close(result[3], 100.0 - 100.0 / 3.0);
        // window at index 4: gains 1,0,2 losses 0,1,0 → rs = 3 → 75
        assert_close(result[4], 75.0);
    }

    #[test]
    fn rsi_no_losses_defaults_to_fifty() {
        let result = rsi(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_close(result[4], 50.0);
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let result = rsi(&[5.0, 4.0, 3.0, 2.0], 2);
        assert_close(result[3], 0.0);
    }

    #[test]
    fn rsi_within_bounds() {
        let values = [44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1];
        for v in rsi(&values, 4).into_iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v));
        }
    }
}
