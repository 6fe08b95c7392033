//! Backtest output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::KimchiError;
use std::path::Path;

/// Port for writing a backtest's trade log.
pub trait ReportPort {
    fn write_trades(&self, result: &BacktestResult, output_path: &Path) -> Result<(), KimchiError>;
}
