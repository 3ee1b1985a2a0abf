//! CSV backtest report adapter.
//!
//! One row per evaluated candle: `index,timestamp,value,skipped`. A skipped
//! step has an empty value; `na` values are written as `na`.

use crate::domain::backtest::BacktestRun;
use crate::domain::error::QuantflowError;
use crate::ports::report_port::ReportPort;
use tracing::info;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Render a run to any writer.
    pub fn write_to<W: std::io::Write>(
        &self,
        writer: W,
        run: &BacktestRun,
    ) -> Result<(), QuantflowError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["index", "timestamp", "value", "skipped"])
            .map_err(csv_error)?;

        for step in &run.steps {
            let value = step.value().map(|v| v.to_string()).unwrap_or_default();
            wtr.write_record([
                step.index.to_string(),
                step.timestamp.to_string(),
                value,
                step.is_skipped().to_string(),
            ])
            .map_err(csv_error)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn csv_error(e: csv::Error) -> QuantflowError {
    QuantflowError::Data {
        reason: format!("CSV write error: {e}"),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_backtest(
        &self,
        symbol: &str,
        run: &BacktestRun,
        output_path: &str,
    ) -> Result<(), QuantflowError> {
        let file = std::fs::File::create(output_path)?;
        self.write_to(file, run)?;
        info!(symbol, path = output_path, rows = run.steps.len(), "backtest report written");
        Ok(())
    }
}
