#![allow(dead_code)]

use chrono::NaiveDate;
use meanrev::domain::error::MeanrevError;
pub use meanrev::domain::price_history::CloseObservation;
use meanrev::domain::price_history::{PriceHistory, PriceSeries};
use meanrev::domain::simulator::{SimulationConfig, SimulationResult};
use meanrev::ports::data_port::PriceDataPort;
use meanrev::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub data: BTreeMap<String, Vec<CloseObservation>>,
    pub errors: BTreeMap<String, String>,
    pub missing: Vec<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
            missing: Vec::new(),
        }
    }

    pub fn with_closes(mut self, instrument: &str, closes: Vec<CloseObservation>) -> Self {
        self.data.insert(instrument.to_string(), closes);
        self
    }

    /// Fetches fail with `Data`, as for a malformed file.
    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }

    /// Fetches fail with `NoData`, as for a code without a price file.
    pub fn with_missing(mut self, instrument: &str) -> Self {
        self.missing.push(instrument.to_string());
        self
    }

    fn fail(&self, instrument: &str) -> Option<MeanrevError> {
        if self.missing.iter().any(|m| m == instrument) {
            return Some(MeanrevError::NoData {
                instrument: instrument.to_string(),
            });
        }
        self.errors.get(instrument).map(|reason| MeanrevError::Data {
            reason: reason.clone(),
        })
    }
}

impl PriceDataPort for MockDataPort {
    fn fetch_closes(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<CloseObservation>, MeanrevError> {
        if let Some(err) = self.fail(instrument) {
            return Err(err);
        }
        Ok(self
            .data
            .get(instrument)
            .map(|obs| {
                obs.iter()
                    .filter(|o| o.day >= start_date && o.day <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_instruments(&self) -> Result<Vec<String>, MeanrevError> {
        Ok(self.data.keys().cloned().collect())
    }

    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, MeanrevError> {
        if let Some(err) = self.fail(instrument) {
            return Err(err);
        }
        match self.data.get(instrument) {
            Some(obs) if !obs.is_empty() => {
                let min = obs.iter().map(|o| o.day).min().unwrap();
                let max = obs.iter().map(|o| o.day).max().unwrap();
                Ok(Some((min, max, obs.len())))
            }
            _ => Ok(None),
        }
    }
}

/// Report port that remembers what it was asked to write.
#[derive(Default)]
pub struct RecordingReportPort {
    pub equity_writes: RefCell<Vec<(PathBuf, usize)>>,
    pub snapshot_writes: RefCell<Vec<(PathBuf, usize)>>,
}

impl ReportPort for RecordingReportPort {
    fn write_equity_curve(
        &self,
        result: &SimulationResult,
        output_path: &Path,
    ) -> Result<(), MeanrevError> {
        self.equity_writes
            .borrow_mut()
            .push((output_path.to_path_buf(), result.days.len()));
        Ok(())
    }

    fn write_snapshot(
        &self,
        result: &SimulationResult,
        output_path: &Path,
    ) -> Result<(), MeanrevError> {
        self.snapshot_writes
            .borrow_mut()
            .push((output_path.to_path_buf(), result.portfolio.positions.len()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Day of January 2024.
pub fn jan(d: u32) -> NaiveDate {
    date(2024, 1, d)
}

/// Present closes on consecutive January 2024 days starting at `first_day`.
pub fn closes(first_day: u32, values: &[f64]) -> Vec<CloseObservation> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| CloseObservation::new(jan(first_day + i as u32), v))
        .collect()
}

pub fn series(instrument: &str, observations: Vec<CloseObservation>) -> PriceSeries {
    PriceSeries::new(instrument, observations).unwrap()
}

pub fn history(series_list: Vec<PriceSeries>) -> PriceHistory {
    PriceHistory::from_series(series_list).unwrap()
}

pub fn sample_config(first_day: u32, last_day: u32) -> SimulationConfig {
    SimulationConfig::new(jan(first_day), jan(last_day), 1_000_000.0)
}

/// Deterministic pseudo-random walk, no external RNG.
pub fn generate_closes(seed: u64, first_day: u32, count: usize, start_price: f64) -> Vec<CloseObservation> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut price = start_price;
    (0..count)
        .map(|i| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let step = ((state >> 33) % 2001) as f64 / 1000.0 - 1.0;
            price *= 1.0 + step * 0.03;
            CloseObservation::new(jan(first_day) + chrono::Duration::days(i as i64), price)
        })
        .collect()
}
