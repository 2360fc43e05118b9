//! Report generation port trait.

use crate::domain::error::MeanrevError;
use crate::domain::simulator::SimulationResult;
use std::path::Path;

/// Sink for a finished simulation: the daily equity curve and the final
/// weight/position snapshot.
pub trait ReportPort {
    fn write_equity_curve(
        &self,
        result: &SimulationResult,
        output_path: &Path,
    ) -> Result<(), MeanrevError>;

    fn write_snapshot(
        &self,
        result: &SimulationResult,
        output_path: &Path,
    ) -> Result<(), MeanrevError>;
}
