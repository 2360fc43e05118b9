//! Close-price data access port trait.

use crate::domain::error::MeanrevError;
use crate::domain::price_history::CloseObservation;
use chrono::NaiveDate;

pub trait PriceDataPort {
    /// Observations inside the inclusive window, in source order.
    fn fetch_closes(
        &self,
        instrument: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<CloseObservation>, MeanrevError>;

    fn list_instruments(&self) -> Result<Vec<String>, MeanrevError>;

    /// First day, last day and number of closes across the whole source.
    fn get_data_range(
        &self,
        instrument: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, MeanrevError>;
}
