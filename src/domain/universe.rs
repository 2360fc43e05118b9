//! Instrument universe: code list parsing and data validation.
//!
//! Instruments without enough closes in the window are dropped with a warning;
//! the run only fails when none survive.

use crate::domain::error::MeanrevError;
use crate::domain::price_history::PriceSeries;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

/// A return needs two closes.
pub const MIN_CLOSES: usize = 2;

#[derive(Debug, Clone)]
pub struct Universe {
    pub instruments: Vec<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientCloses { closes: usize },
}

#[derive(Debug, Clone)]
pub struct SkippedInstrument {
    pub instrument: String,
    pub reason: SkipReason,
}

/// Loaded universe: validated series ready for the history store.
pub struct LoadedUniverse {
    pub universe: Universe,
    pub series: Vec<PriceSeries>,
    pub skipped: Vec<SkippedInstrument>,
}

/// Fetch every instrument's closes and keep the ones that can produce a return.
///
/// A missing price file or a short series only skips the instrument. Unreadable
/// files, ordering and duplicate-day problems are fatal: the source data is
/// malformed, not merely short.
pub fn load_universe(
    data_port: &dyn PriceDataPort,
    instruments: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<LoadedUniverse, MeanrevError> {
    let mut valid = Vec::new();
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for instrument in instruments {
        let observations = match data_port.fetch_closes(&instrument, start_date, end_date) {
            Ok(obs) => obs,
            Err(MeanrevError::NoData { .. }) => {
                warn!(%instrument, "skipping instrument, no price file");
                skipped.push(SkippedInstrument {
                    instrument,
                    reason: SkipReason::NoData,
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        let loaded = PriceSeries::new(instrument.clone(), observations)?;
        let closes = loaded.present_count();
        if closes == 0 {
            warn!(%instrument, "skipping instrument, no closes in window");
            skipped.push(SkippedInstrument {
                instrument,
                reason: SkipReason::NoData,
            });
            continue;
        }
        if closes < MIN_CLOSES {
            warn!(%instrument, closes, minimum = MIN_CLOSES, "skipping instrument");
            skipped.push(SkippedInstrument {
                instrument,
                reason: SkipReason::InsufficientCloses { closes },
            });
            continue;
        }

        series.push(loaded);
        info!(%instrument, closes, "loaded");
        valid.push(instrument);
    }

    if valid.is_empty() {
        return Err(MeanrevError::EmptyUniverse {
            requested: skipped.len(),
        });
    }

    if !skipped.is_empty() {
        info!(
            loaded = valid.len(),
            requested = valid.len() + skipped.len(),
            "universe partially loaded"
        );
    }

    Ok(LoadedUniverse {
        universe: Universe {
            instruments: valid,
        },
        series,
        skipped,
    })
}
