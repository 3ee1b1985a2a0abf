//! Report generation port.

use crate::domain::backtest::BacktestRun;
use crate::domain::error::QuantflowError;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write_backtest(
        &self,
        symbol: &str,
        run: &BacktestRun,
        output_path: &str,
    ) -> Result<(), QuantflowError>;
}
