//! Backtest driver.
//!
//! Replays a program over every candle of a series with a single
//! [`ExecutionContext`], so variables assigned at one step are visible at the
//! next. A failing step is recorded as skipped and the run continues; early
//! candles routinely lack indicator history.
//!
//! A run is strictly sequential. An optional cancellation flag is polled
//! before each step; when it is set the run stops and returns the steps
//! completed so far.

use crate::domain::ast::Program;
use crate::domain::context::ExecutionContext;
use crate::domain::error::EvalError;
use crate::domain::eval::evaluate_program;
use crate::domain::ohlcv::Series;
use crate::domain::value::{Value, Variables};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Value(Value),
    Skipped(EvalError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestStep {
    pub index: usize,
    pub timestamp: i64,
    pub outcome: StepOutcome,
}

impl BacktestStep {
    pub fn value(&self) -> Option<&Value> {
        match &self.outcome {
            StepOutcome::Value(v) => Some(v),
            StepOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, StepOutcome::Skipped(_))
    }
}

#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub steps: Vec<BacktestStep>,
    /// Variable bindings after the last evaluated step.
    pub variables: Variables,
    pub cancelled: bool,
}

impl BacktestRun {
    pub fn skipped_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_skipped()).count()
    }

    /// One entry per evaluated candle, `None` where the step was skipped.
    pub fn values(&self) -> Vec<Option<Value>> {
        self.steps.iter().map(|s| s.value().cloned()).collect()
    }
}

pub fn run_backtest(
    program: &Program,
    series: &Series,
    variables: Variables,
    cancel: Option<&AtomicBool>,
) -> BacktestRun {
    let mut ctx = ExecutionContext::new(series, variables, 0);
    let mut steps = Vec::with_capacity(series.len());
    let mut cancelled = false;

    for (index, candle) in series.candles().iter().enumerate() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            cancelled = true;
            break;
        }

        ctx.set_index(index);
        let outcome = match evaluate_program(program, &mut ctx) {
            Ok(value) => StepOutcome::Value(value),
            Err(e) => {
                debug!(index, timestamp = candle.timestamp, error = %e, "backtest step skipped");
                StepOutcome::Skipped(e)
            }
        };
        steps.push(BacktestStep {
            index,
            timestamp: candle.timestamp,
            outcome,
        });
    }

    let run = BacktestRun {
        steps,
        variables: ctx.into_variables(),
        cancelled,
    };
    info!(
        candles = series.len(),
        evaluated = run.steps.len(),
        skipped = run.skipped_count(),
        cancelled = run.cancelled,
        "backtest finished"
    );
    run
}

/// Per-candle results of a full run, `None` for failed steps.
pub fn execute_backtest(
    program: &Program,
    series: &Series,
    variables: Variables,
) -> Vec<Option<Value>> {
    run_backtest(program, series, variables, None).values()
}
