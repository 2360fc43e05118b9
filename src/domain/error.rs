//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for meanrev.
#[derive(Debug, thiserror::Error)]
pub enum MeanrevError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error("no usable instruments out of {requested} requested")]
    EmptyUniverse { requested: usize },

    #[error("{instrument}: {day} is out of order (previous day {previous})")]
    DataOrder {
        instrument: String,
        day: NaiveDate,
        previous: NaiveDate,
    },

    #[error("{instrument}: duplicate entry for {day}")]
    DuplicateDay { instrument: String, day: NaiveDate },

    #[error("{instrument}: price series loaded twice")]
    DuplicateInstrument { instrument: String },

    #[error("{instrument}: invalid close {price} on {day}")]
    InvalidPrice {
        instrument: String,
        day: NaiveDate,
        price: f64,
    },

    #[error("equity is {equity:.2} on {day}, cannot size positions")]
    ZeroEquity { day: NaiveDate, equity: f64 },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MeanrevError> for std::process::ExitCode {
    fn from(err: &MeanrevError) -> Self {
        let code: u8 = match err {
            MeanrevError::Io(_) => 1,
            MeanrevError::ConfigParse { .. }
            | MeanrevError::ConfigMissing { .. }
            | MeanrevError::ConfigInvalid { .. } => 2,
            MeanrevError::Data { .. }
            | MeanrevError::NoData { .. }
            | MeanrevError::EmptyUniverse { .. } => 3,
            MeanrevError::DataOrder { .. }
            | MeanrevError::DuplicateDay { .. }
            | MeanrevError::DuplicateInstrument { .. } => 4,
            MeanrevError::InvalidPrice { .. } | MeanrevError::ZeroEquity { .. } => 5,
            MeanrevError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
