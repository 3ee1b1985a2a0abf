//! Signal generation from strategy programs.
//!
//! The program is evaluated at the last candle of each symbol with the
//! symbol's position state bound as variables:
//!
//! - `position_size`: open size, 0 when flat
//! - `position_side`: `"long"`, `"short"` or `"none"`
//! - `entry_price`: entry price, 0 when flat
//!
//! `true` with no open position is a Buy of the order quantity; `false` with an
//! open position is a Sell of the whole position. Anything else produces no
//! signal. Strategies written as `strategy(...)` blocks reduce to the same
//! `true`/`false` through their buy and sell rules.

use crate::domain::ast::Program;
use crate::domain::error::EvalError;
use crate::domain::execution::execute;
use crate::domain::ohlcv::Series;
use crate::domain::position::Position;
use crate::domain::value::{Value, Variables};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error};

pub const DEFAULT_ORDER_QUANTITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => f.write_str("buy"),
            Action::Sell => f.write_str("sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub symbol: String,
    pub action: Action,
    pub quantity: f64,
    /// Timestamp of the candle the decision was made on.
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    pub order_quantity: f64,
    /// Bindings every evaluation starts from; position variables override them.
    pub variables: Variables,
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self {
            order_quantity: DEFAULT_ORDER_QUANTITY,
            variables: Variables::new(),
        }
    }
}

impl SignalGenerator {
    pub fn new(order_quantity: f64, variables: Variables) -> Self {
        Self {
            order_quantity,
            variables,
        }
    }

    /// Evaluate one symbol and derive its signal, if any.
    pub fn signal_for(
        &self,
        program: &Program,
        symbol: &str,
        series: &Series,
        position: Option<&Position>,
    ) -> Result<Option<Signal>, EvalError> {
        let open = position.filter(|p| p.is_open());
        let mut variables = self.variables.clone();
        bind_position(&mut variables, open);

        let value = execute(program, series, variables)?;
        let timestamp = series.last().map(|c| c.timestamp).unwrap_or_default();
        debug!(symbol, %value, "strategy evaluated");

        let signal = match (value, open) {
            (Value::Bool(true), None) => Some(Signal {
                symbol: symbol.to_string(),
                action: Action::Buy,
                quantity: self.order_quantity,
                timestamp,
            }),
            (Value::Bool(false), Some(p)) => Some(Signal {
                symbol: symbol.to_string(),
                action: Action::Sell,
                quantity: p.size,
                timestamp,
            }),
            _ => None,
        };
        Ok(signal)
    }

    /// Signals across all symbols, in symbol order. A symbol that fails to
    /// evaluate is logged and skipped.
    pub fn generate(
        &self,
        program: &Program,
        candles_by_symbol: &HashMap<String, Series>,
        positions_by_symbol: &HashMap<String, Position>,
    ) -> Vec<Signal> {
        let mut symbols: Vec<&String> = candles_by_symbol.keys().collect();
        symbols.sort();

        let mut signals = Vec::new();
        for symbol in symbols {
            let series = &candles_by_symbol[symbol];
            match self.signal_for(program, symbol, series, positions_by_symbol.get(symbol)) {
                Ok(Some(signal)) => signals.push(signal),
                Ok(None) => {}
                Err(e) => error!(symbol = %symbol, error = %e, "strategy evaluation failed"),
            }
        }
        signals
    }
}

fn bind_position(variables: &mut Variables, position: Option<&Position>) {
    let (size, side, entry) = match position {
        Some(p) => (p.size, p.side.as_str(), p.entry_price),
        None => (0.0, "none", 0.0),
    };
    variables.insert("position_size".into(), Value::Number(size));
    variables.insert("position_side".into(), Value::Str(side.into()));
    variables.insert("entry_price".into(), Value::Number(entry));
}

/// Signals with the default order quantity and no extra variables.
pub fn execute_strategy(
    program: &Program,
    candles_by_symbol: &HashMap<String, Series>,
    positions_by_symbol: &HashMap<String, Position>,
) -> Vec<Signal> {
    SignalGenerator::default().generate(program, candles_by_symbol, positions_by_symbol)
}
