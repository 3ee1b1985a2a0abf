//! ATR (Average True Range).
//!
//! TR[i] = max(H[i] - L[i], |H[i] - C[i-1]|, |L[i] - C[i-1]|) for i >= 1.
//! ATR(n)[i] = SMA(n) of TR ending at i.
//!
//! Index 0 has no previous close and therefore no true range; the first
//! defined value is at index n.

use super::{sma, undefined};
use crate::domain::ohlcv::Candle;

pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < 2 {
        return undefined(candles.len());
    }

    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();

    let mut result = Vec::with_capacity(candles.len());
    result.push(f64::NAN);
    result.extend(sma(&true_ranges, period));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{assert_close, make_candles};

    #[test]
    fn atr_first_index_undefined() {
        let candles = make_candles(&[(10.0, 8.0, 9.0), (11.0, 9.0, 10.0)]);
        let result = atr(&candles, 1);
        assert!(result[0].is_nan());
        assert_close(result[1], 2.0);
    }

    #[test]
    fn atr_uses_previous_close() {
        // gap up: |H - prev close| = |15 - 9| = 6 dominates H - L = 2
        let candles = make_candles(&[(10.0, 8.0, 9.0), (15.0, 13.0, 14.0)]);
        let result = atr(&candles, 1);
        assert_close(result[1], 6.0);
    }

    #[test]
    fn atr_warmup_and_average() {
        let candles = make_candles(&[
            (10.0, 8.0, 9.0),
            (11.0, 9.0, 10.0),
            (12.0, 9.0, 11.0),
            (12.0, 11.0, 11.5),
        ]);
        let result = atr(&candles, 2);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        // TR: 2, 3, 1
        assert_close(result[2], 2.5);
        assert_close(result[3], 2.0);
    }

    #[test]
    fn atr_single_candle() {
        let candles = make_candles(&[(10.0, 8.0, 9.0)]);
        let result = atr(&candles, 1);
        assert_eq!(result.len(), 1);
        assert!(result[0].is_nan());
    }

    #[test]
    fn atr_is_non_negative() {
        let candles = make_candles(&[
            (10.0, 8.0, 9.0),
            (9.5, 7.0, 7.5),
            (8.0, 6.0, 7.9),
            (12.0, 7.5, 11.0),
        ]);
        for v in atr(&candles, 1).into_iter().skip(1) {
            assert!(v >= 0.0);
        }
    }
}
