//! Report generation port trait.

use crate::domain::error::MeanrevError;
use crate::domain::result::BacktestResult;
use crate::domain::sweep::SweepOutcome;

/// Port for writing backtest results for downstream charting.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult) -> Result<(), MeanrevError>;

    fn write_sweep(&self, outcomes: &[SweepOutcome]) -> Result<(), MeanrevError>;
}
