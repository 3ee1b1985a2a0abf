//! Strategy language and evaluation: lexing, parsing, indicators, the
//! evaluator, backtests and signal generation.

pub mod ast;
pub mod backtest;
pub mod builtin;
pub mod config_validation;
pub mod context;
pub mod error;
pub mod eval;
pub mod execution;
pub mod indicator;
pub mod lexer;
pub mod ohlcv;
pub mod parser;
pub mod position;
pub mod strategy;
pub mod token;
pub mod universe;
pub mod value;
