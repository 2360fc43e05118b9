//! Configuration validation.
//!
//! Every field a run depends on is checked before any data is loaded.

use crate::domain::error::MeanrevError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    validate_initial_capital(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    if config.get_string("data", "dir").is_none() {
        return Err(MeanrevError::ConfigMissing {
            section: "data".to_string(),
            key: "dir".to_string(),
        });
    }
    if let Some(codes) = config.get_string("data", "codes") {
        crate::domain::universe::parse_codes(&codes).map_err(|e| {
            MeanrevError::ConfigInvalid {
                section: "data".to_string(),
                key: "codes".to_string(),
                reason: e.to_string(),
            }
        })?;
    }
    Ok(())
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    validate_simulation_config(config)?;
    validate_data_config(config)?;
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    if config.get_string("simulation", "initial_capital").is_none() {
        return Err(MeanrevError::ConfigMissing {
            section: "simulation".to_string(),
            key: "initial_capital".to_string(),
        });
    }
    let value = config.get_double("simulation", "initial_capital", 0.0);
    if !(value > 0.0) || !value.is_finite() {
        return Err(MeanrevError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be a positive number".to_string(),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    let value = config.get_double("simulation", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(MeanrevError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date > end_date {
        return Err(MeanrevError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must not be after end_date".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, MeanrevError> {
    match config.get_date("simulation", field) {
        None => Err(MeanrevError::ConfigMissing {
            section: "simulation".to_string(),
            key: field.to_string(),
        }),
        Some(Ok(day)) => Ok(day),
        Some(Err(raw)) => Err(MeanrevError::ConfigInvalid {
            section: "simulation".to_string(),
            key: field.to_string(),
            reason: format!("invalid date '{}', expected YYYY-MM-DD", raw),
        }),
    }
}
