//! Crossover and crossunder.
//!
//! Both compare the two arguments at the current index only: crossover is
//! `a > b`, crossunder is `a < b`. Strategies written against this rely on the
//! pointwise reading, so a true "crossed since the previous candle" check is
//! spelled out with index access instead, e.g.
//! `ta.crossover(fast, slow) and fast[1] <= slow[1]`.

pub fn crossover(a: f64, b: f64) -> bool {
    a > b
}

pub fn crossunder(a: f64, b: f64) -> bool {
    a < b
}
