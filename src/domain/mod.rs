//! Core domain types and logic.

pub mod price_history;
pub mod weighting;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod simulator;
pub mod metrics;
pub mod universe;
pub mod config_validation;
pub mod error;
