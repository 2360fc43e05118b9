//! CSV close-price adapter.
//!
//! One file per instrument, `<dir>/<CODE>.csv`, with a header row. The first
//! column is the date (`YYYY-MM-DD`, time suffixes ignored). The close column is
//! found by header: `adj close` / `adj_close` when present, else `close`. An empty
//! close cell is an absent close. Rows are returned in file order.

use crate::domain::error::MeanrevError;
use crate::domain::price_history::CloseObservation;
use crate::ports::config_port::DATE_FORMAT;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }

    fn close_column(headers: &csv::StringRecord) -> Option<usize> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        normalized
            .iter()
            .position(|h| h == "adj close" || h == "adj_close")
            .or_else(|| normalized.iter().position(|h| h == "close"))
    }

    fn parse_date(raw: &str) -> Result<NaiveDate, MeanrevError> {
        let trimmed = raw.trim();
        let day_part = trimmed.get(..10).unwrap_or(trimmed);
        NaiveDate::parse_from_str(day_part, DATE_FORMAT).map_err(|e| MeanrevError::Data {
            reason: format!("invalid date '{}': {}", raw, e),
        })
    }

    fn read_all(&self, instrument: &str) -> Result<Vec<CloseObservation>, MeanrevError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => MeanrevError::NoData {
                instrument: instrument.to_string(),
            },
            _ => MeanrevError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| MeanrevError::Data {
            reason: format!("{}: CSV header error: {}", path.display(), e),
        })?;
        let close_idx = Self::close_column(headers).ok_or_else(|| MeanrevError::Data {
            reason: format!("{}: no close column", path.display()),
        })?;

        let mut observations = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| MeanrevError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| MeanrevError::Data {
                reason: "missing date column".into(),
            })?;
            let day = Self::parse_date(date_str)?;

            let close = match record.get(close_idx).map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(raw.parse::<f64>().map_err(|e| MeanrevError::Data {
                    reason: format!("{} {}: invalid close '{}': {}", instrument, day, raw, e),
                })?),
            };

            observations.push(CloseObservation { day, close });
        }

        Ok(observations)
    }
}

impl PriceDataPort for CsvAdapter {
    fn fetch_closes(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<CloseObservation>, MeanrevError> {
        Ok(self
            .read_all(instrument)?
            .into_iter()
            .filter(|o| o.day >= start_date && o.day <= end_date)
            .collect())
    }

    fn list_instruments(&self) -> Result<Vec<String>, MeanrevError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| MeanrevError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MeanrevError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(code) = name_str.strip_suffix(".csv") {
                if !code.is_empty() {
                    instruments.push(code.to_string());
                }
            }
        }

        instruments.sort();
        Ok(instruments)
    }

    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, MeanrevError> {
        let observations = self.read_all(instrument)?;
        let days: Vec<NaiveDate> = observations
            .iter()
            .filter(|o| o.close.is_some())
            .map(|o| o.day)
            .collect();
        match (days.iter().min(), days.iter().max()) {
            (Some(&min), Some(&max)) => Ok(Some((min, max, days.len()))),
            _ => Ok(None),
        }
    }
}
