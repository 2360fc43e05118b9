//! Price history store: per-instrument close series and the unified trading calendar.
//!
//! A close may be explicitly absent for a day (not yet listed, halted), which is
//! distinct from a zero close. Lookups are O(1) through a per-series day index;
//! the calendar is the sorted union of every series' days.

use crate::domain::error::MeanrevError;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One raw observation as supplied by a data source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseObservation {
    pub day: NaiveDate,
    pub close: Option<f64>,
}

impl CloseObservation {
    pub fn new(day: NaiveDate, close: f64) -> Self {
        Self {
            day,
            close: Some(close),
        }
    }

    pub fn absent(day: NaiveDate) -> Self {
        Self { day, close: None }
    }
}

#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub instrument: String,
    observations: Vec<CloseObservation>,
    day_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    /// Build a series, rejecting days that repeat or go backwards.
    pub fn new(
        instrument: impl Into<String>,
        observations: Vec<CloseObservation>,
    ) -> Result<Self, MeanrevError> {
        let instrument = instrument.into();
        for pair in observations.windows(2) {
            let (previous, day) = (pair[0].day, pair[1].day);
            if day == previous {
                return Err(MeanrevError::DuplicateDay { instrument, day });
            }
            if day < previous {
                return Err(MeanrevError::DataOrder {
                    instrument,
                    day,
                    previous,
                });
            }
        }

        let day_index = observations
            .iter()
            .enumerate()
            .map(|(i, obs)| (obs.day, i))
            .collect();

        Ok(Self {
            instrument,
            observations,
            day_index,
        })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Number of days that carry an actual close.
    pub fn present_count(&self) -> usize {
        self.observations.iter().filter(|o| o.close.is_some()).count()
    }

    pub fn observations(&self) -> &[CloseObservation] {
        &self.observations
    }

    pub fn close(&self, day: NaiveDate) -> Option<f64> {
        self.day_index
            .get(&day)
            .and_then(|&i| self.observations[i].close)
    }
}

/// A close usable for returns and sizing: finite and strictly positive.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    series: BTreeMap<String, PriceSeries>,
    calendar: Vec<NaiveDate>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-validated series.
    pub fn from_series(series: Vec<PriceSeries>) -> Result<Self, MeanrevError> {
        let mut history = Self::new();
        for s in series {
            history.insert(s)?;
        }
        Ok(history)
    }

    pub fn insert(&mut self, series: PriceSeries) -> Result<(), MeanrevError> {
        if self.series.contains_key(&series.instrument) {
            return Err(MeanrevError::DuplicateInstrument {
                instrument: series.instrument,
            });
        }
        self.series.insert(series.instrument.clone(), series);
        self.rebuild_calendar();
        Ok(())
    }

    fn rebuild_calendar(&mut self) {
        let days: BTreeSet<NaiveDate> = self
            .series
            .values()
            .flat_map(|s| s.observations.iter().map(|o| o.day))
            .collect();
        self.calendar = days.into_iter().collect();
    }

    /// Instruments in ascending identifier order.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn instrument_count(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self, instrument: &str) -> Option<&PriceSeries> {
        self.series.get(instrument)
    }

    pub fn calendar(&self) -> &[NaiveDate] {
        &self.calendar
    }

    pub fn close(&self, instrument: &str, day: NaiveDate) -> Option<f64> {
        self.series.get(instrument)?.close(day)
    }

    /// The trading day immediately before `day` in the unified calendar.
    pub fn previous_day(&self, day: NaiveDate) -> Option<NaiveDate> {
        let idx = self.calendar.partition_point(|&d| d < day);
        idx.checked_sub(1).map(|i| self.calendar[i])
    }

    pub fn previous_close(&self, instrument: &str, day: NaiveDate) -> Option<f64> {
        self.close(instrument, self.previous_day(day)?)
    }

    /// True when both today's and the previous trading day's close exist.
    pub fn is_eligible(&self, instrument: &str, day: NaiveDate) -> bool {
        self.close(instrument, day).is_some() && self.previous_close(instrument, day).is_some()
    }

    /// Single-day fractional return, or `None` when the instrument is not eligible.
    ///
    /// Zero, negative or non-finite closes produce `InvalidPrice`.
    pub fn daily_return(
        &self,
        instrument: &str,
        day: NaiveDate,
    ) -> Result<Option<f64>, MeanrevError> {
        let Some(previous) = self.previous_day(day) else {
            return Ok(None);
        };
        let (Some(today), Some(yesterday)) = (
            self.close(instrument, day),
            self.close(instrument, previous),
        ) else {
            return Ok(None);
        };

        if !is_valid_price(yesterday) {
            return Err(MeanrevError::InvalidPrice {
                instrument: instrument.to_string(),
                day: previous,
                price: yesterday,
            });
        }
        if !is_valid_price(today) {
            return Err(MeanrevError::InvalidPrice {
                instrument: instrument.to_string(),
                day,
                price: today,
            });
        }

        Ok(Some(today / yesterday - 1.0))
    }

    /// Calendar days inside the inclusive window.
    pub fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.calendar
            .iter()
            .copied()
            .filter(|&d| d >= start && d <= end)
            .collect()
    }
}
