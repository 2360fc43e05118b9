//! CSV report adapter implementing ReportPort.
//!
//! Writes the per-day equity curve and the end-of-run position snapshot.

use crate::domain::error::MeanrevError;
use crate::domain::simulator::SimulationResult;
use crate::ports::report_port::ReportPort;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const EQUITY_HEADER: [&str; 7] = [
    "date",
    "equity",
    "cash",
    "gross_exposure",
    "net_exposure",
    "eligible",
    "fills",
];

const SNAPSHOT_HEADER: [&str; 7] = [
    "instrument",
    "weight",
    "quantity",
    "last_fill_price",
    "mark_price",
    "market_value",
    "target_weight",
];

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn writer(path: &Path) -> Result<csv::Writer<fs::File>, MeanrevError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(MeanrevError::Io)?;
            }
        }
        csv::Writer::from_path(path).map_err(|e| report_error(path, e))
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn report_error(path: &Path, e: impl std::fmt::Display) -> MeanrevError {
    MeanrevError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_equity_curve(
        &self,
        result: &SimulationResult,
        output_path: &Path,
    ) -> Result<(), MeanrevError> {
        let mut wtr = Self::writer(output_path)?;
        wtr.write_record(EQUITY_HEADER)
            .map_err(|e| report_error(output_path, e))?;

        for day in &result.days {
            wtr.write_record([
                day.date.to_string(),
                day.equity.to_string(),
                day.cash.to_string(),
                day.gross_exposure.to_string(),
                day.net_exposure.to_string(),
                day.eligible_count().to_string(),
                day.fills.len().to_string(),
            ])
            .map_err(|e| report_error(output_path, e))?;
        }

        wtr.flush().map_err(MeanrevError::Io)?;
        Ok(())
    }

    fn write_snapshot(
        &self,
        result: &SimulationResult,
        output_path: &Path,
    ) -> Result<(), MeanrevError> {
        let mut wtr = Self::writer(output_path)?;
        wtr.write_record(SNAPSHOT_HEADER)
            .map_err(|e| report_error(output_path, e))?;

        let equity = result.final_equity();
        let instruments: BTreeSet<&str> = result
            .portfolio
            .positions
            .keys()
            .chain(result.final_weights.keys())
            .map(String::as_str)
            .collect();

        for instrument in instruments {
            let position = result.portfolio.get_position(instrument);
            let market_value = position.map(|p| p.marked_value()).unwrap_or(0.0);
            let weight = if equity != 0.0 {
                market_value / equity
            } else {
                0.0
            };
            let target = result.final_weights.get(instrument).copied().unwrap_or(0.0);

            wtr.write_record([
                instrument.to_string(),
                weight.to_string(),
                position.map(|p| p.quantity).unwrap_or(0.0).to_string(),
                position.map(|p| p.last_fill_price.to_string()).unwrap_or_default(),
                position.map(|p| p.mark_price.to_string()).unwrap_or_default(),
                market_value.to_string(),
                target.to_string(),
            ])
            .map_err(|e| report_error(output_path, e))?;
        }

        wtr.flush().map_err(MeanrevError::Io)?;
        Ok(())
    }
}
