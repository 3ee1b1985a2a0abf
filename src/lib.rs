//! quantflow: a Pine-like strategy DSL with parser, evaluator and backtest driver.
//!
//! Hexagonal architecture: language and evaluation logic in [`domain`], port
//! traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
