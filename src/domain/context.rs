//! Execution context: the series being evaluated, the current candle index and
//! the variable bindings of one evaluation pass.
//!
//! A context borrows its series and owns its variables. It is never shared
//! between concurrent evaluations; each strategy/symbol gets its own.

use crate::domain::error::{EvalError, EvalErrorKind};
use crate::domain::ohlcv::{Candle, Series};
use crate::domain::value::{Value, Variables};

#[derive(Debug)]
pub struct ExecutionContext<'a> {
    series: &'a Series,
    pub variables: Variables,
    current_index: usize,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(series: &'a Series, variables: Variables, current_index: usize) -> Self {
        Self {
            series,
            variables,
            current_index,
        }
    }

    /// Context pointed at the last candle, as used for live evaluation.
    pub fn at_latest(series: &'a Series, variables: Variables) -> Self {
        let index = series.len().saturating_sub(1);
        Self::new(series, variables, index)
    }

    pub fn series(&self) -> &'a Series {
        self.series
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn set_index(&mut self, index: usize) {
        self.current_index = index;
    }

    pub fn current_candle(&self) -> Result<&'a Candle, EvalError> {
        self.series.get(self.current_index).ok_or_else(|| {
            EvalError::new(
                EvalErrorKind::InvalidIndex,
                format!("no candle data at index {}", self.current_index),
            )
        })
    }

    /// Candles `0..=current_index`; everything evaluation may see.
    pub fn history(&self) -> Result<&'a [Candle], EvalError> {
        self.current_candle()?;
        Ok(self.series.history(self.current_index))
    }

    pub fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::undefined_variable(name))
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn into_variables(self) -> Variables {
        self.variables
    }
}
