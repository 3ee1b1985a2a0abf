//! Run configuration validation.
//!
//! Validates all config fields before any run.

use crate::domain::error::QuantflowError;
use crate::domain::position::Side;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;

pub const POSITION_SECTION_PREFIX: &str = "position.";

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), QuantflowError> {
    validate_data_directory(config)?;
    validate_symbols(config)?;
    validate_order_quantity(config)?;
    validate_positions(config)?;
    Ok(())
}

/// The strategy must come from `[strategy] file` or `[strategy] code`.
pub fn validate_strategy_source(config: &dyn ConfigPort) -> Result<(), QuantflowError> {
    let present = |key: &str| {
        config
            .get_string("strategy", key)
            .is_some_and(|s| !s.trim().is_empty())
    };
    if present("file") || present("code") {
        Ok(())
    } else {
        Err(QuantflowError::ConfigMissing {
            section: "strategy".to_string(),
            key: "file".to_string(),
        })
    }
}

fn validate_data_directory(config: &dyn ConfigPort) -> Result<(), QuantflowError> {
    match config.get_string("data", "directory") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(QuantflowError::ConfigMissing {
            section: "data".to_string(),
            key: "directory".to_string(),
        }),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), QuantflowError> {
    let symbols = config
        .get_string("data", "symbols")
        .ok_or_else(|| QuantflowError::ConfigMissing {
            section: "data".to_string(),
            key: "symbols".to_string(),
        })?;
    parse_symbols(&symbols).map_err(|e| QuantflowError::ConfigInvalid {
        section: "data".to_string(),
        key: "symbols".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn validate_order_quantity(config: &dyn ConfigPort) -> Result<(), QuantflowError> {
    let Some(raw) = config.get_string("strategy", "order_quantity") else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(q) if q.is_finite() && q > 0.0 => Ok(()),
        _ => Err(QuantflowError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "order_quantity".to_string(),
            reason: "order_quantity must be a positive number".to_string(),
        }),
    }
}

fn validate_positions(config: &dyn ConfigPort) -> Result<(), QuantflowError> {
    for section in config.sections() {
        if !section.starts_with(POSITION_SECTION_PREFIX) {
            continue;
        }
        if section.len() == POSITION_SECTION_PREFIX.len() {
            return Err(QuantflowError::ConfigInvalid {
                section,
                key: "symbol".to_string(),
                reason: "position section needs a symbol, e.g. [position.BTCUSDT]".to_string(),
            });
        }

        let size = config.get_double(&section, "size", -1.0);
        if !size.is_finite() || size < 0.0 {
            return Err(QuantflowError::ConfigInvalid {
                section,
                key: "size".to_string(),
                reason: "size must be a non-negative number".to_string(),
            });
        }

        let side = config.get_string(&section, "side").unwrap_or_default();
        if Side::parse(&side).is_none() {
            return Err(QuantflowError::ConfigInvalid {
                section,
                key: "side".to_string(),
                reason: "side must be long or short".to_string(),
            });
        }

        let entry = config.get_double(&section, "entry_price", 0.0);
        if !entry.is_finite() || entry < 0.0 {
            return Err(QuantflowError::ConfigInvalid {
                section,
                key: "entry_price".to_string(),
                reason: "entry_price must be non-negative".to_string(),
            });
        }
    }
    Ok(())
}
