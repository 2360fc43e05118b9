//! Day-by-day rebalancing simulator.
//!
//! The simulator walks the trading calendar in ascending order. On each day it
//! gathers eligible instruments, turns their returns into mean-reversion weights,
//! and fills the resulting target quantities at that day's close. The portfolio is
//! owned here and mutated only in the single-threaded fill step.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::iter::FusedIterator;
use tracing::{debug, info, warn};

use super::error::MeanrevError;
use super::execution::rebalance;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::Fill;
use super::price_history::{is_valid_price, PriceHistory};
use super::weighting::mean_reversion_weights;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    /// Annual rate, consumed by metrics only.
    pub risk_free_rate: f64,
    /// Fan the per-instrument return computation out over rayon.
    pub parallel: bool,
}

impl SimulationConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, initial_capital: f64) -> Self {
        Self {
            start_date,
            end_date,
            initial_capital,
            risk_free_rate: 0.0,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn check(&self) -> Result<(), MeanrevError> {
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(MeanrevError::ConfigInvalid {
                section: "simulation".into(),
                key: "initial_capital".into(),
                reason: "initial_capital must be positive".into(),
            });
        }
        if self.start_date > self.end_date {
            return Err(MeanrevError::ConfigInvalid {
                section: "simulation".into(),
                key: "start_date".into(),
                reason: "start_date must not be after end_date".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Active,
    Finished,
}

/// An instrument left out of one day's weighting because of a bad close.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedInstrument {
    pub instrument: String,
    pub day: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub gross_exposure: f64,
    pub net_exposure: f64,
    pub weights: BTreeMap<String, f64>,
    pub fills: Vec<Fill>,
    pub excluded: Vec<ExcludedInstrument>,
}

impl DayReport {
    pub fn eligible_count(&self) -> usize {
        self.weights.len()
    }

    pub fn rebalanced(&self) -> bool {
        !self.weights.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub portfolio: Portfolio,
    pub days: Vec<DayReport>,
    /// Target weights from the last day that rebalanced.
    pub final_weights: BTreeMap<String, f64>,
}

impl SimulationResult {
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.portfolio.equity_curve
    }

    pub fn final_equity(&self) -> f64 {
        self.portfolio
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.portfolio.initial_capital)
    }
}

pub struct Simulator<'a> {
    history: &'a PriceHistory,
    config: SimulationConfig,
    days: Vec<NaiveDate>,
    cursor: usize,
    portfolio: Portfolio,
    state: SimulationState,
    last_weights: BTreeMap<String, f64>,
}

impl<'a> Simulator<'a> {
    pub fn new(history: &'a PriceHistory, config: SimulationConfig) -> Result<Self, MeanrevError> {
        config.check()?;
        Ok(Self::start(history, config))
    }

    fn start(history: &'a PriceHistory, config: SimulationConfig) -> Self {
        let days = history.trading_days(config.start_date, config.end_date);
        let state = if days.is_empty() {
            SimulationState::Finished
        } else {
            SimulationState::Active
        };
        Self {
            history,
            portfolio: Portfolio::new(config.initial_capital),
            config,
            days,
            cursor: 0,
            state,
            last_weights: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// The next day to be simulated, if any.
    pub fn next_day(&self) -> Option<NaiveDate> {
        match self.state {
            SimulationState::Active => self.days.get(self.cursor).copied(),
            SimulationState::Finished => None,
        }
    }

    pub fn remaining_days(&self) -> usize {
        match self.state {
            SimulationState::Active => self.days.len() - self.cursor,
            SimulationState::Finished => 0,
        }
    }

    /// Returns of every eligible instrument in ascending identifier order, plus
    /// the instruments dropped for invalid closes.
    fn eligible_returns(&self, day: NaiveDate) -> (Vec<(String, f64)>, Vec<ExcludedInstrument>) {
        let history = self.history;
        let instruments: Vec<&str> = history
            .instruments()
            .filter(|code| history.is_eligible(code, day))
            .collect();
        let compute = |code: &&str| (code.to_string(), history.daily_return(code, day));

        let results: Vec<(String, Result<Option<f64>, MeanrevError>)> = if self.config.parallel {
            instruments.par_iter().map(compute).collect()
        } else {
            instruments.iter().map(compute).collect()
        };

        let mut returns = Vec::with_capacity(results.len());
        let mut excluded = Vec::new();
        for (code, result) in results {
            match result {
                Ok(Some(r)) => returns.push((code, r)),
                Ok(None) => {}
                Err(MeanrevError::InvalidPrice {
                    instrument,
                    day: bad_day,
                    price,
                }) => {
                    warn!(%instrument, day = %bad_day, price, "invalid close, excluded for the day");
                    excluded.push(ExcludedInstrument {
                        instrument,
                        day: bad_day,
                        price,
                    });
                }
                Err(e) => {
                    warn!(instrument = %code, error = %e, "return unavailable, excluded for the day");
                }
            }
        }
        (returns, excluded)
    }

    /// Simulate one trading day.
    ///
    /// Returns `Ok(None)` once finished. A `ZeroEquity` error moves the simulator
    /// to `Finished`; the portfolio stays as it was when the error was raised.
    pub fn step(&mut self) -> Result<Option<DayReport>, MeanrevError> {
        let Some(day) = self.next_day() else {
            self.state = SimulationState::Finished;
            return Ok(None);
        };

        let history = self.history;
        let valid_close = |code: &str| history.close(code, day).filter(|&p| is_valid_price(p));
        self.portfolio.mark_to_market(valid_close);

        let (returns, excluded) = self.eligible_returns(day);
        let mut weights = BTreeMap::new();
        let mut fills = Vec::new();

        if returns.is_empty() {
            debug!(%day, "no eligible instruments, holding");
        } else {
            let equity = self.portfolio.total_equity();
            weights = mean_reversion_weights(&returns);
            match rebalance(&mut self.portfolio, &weights, valid_close, equity, day) {
                Ok(f) => fills = f,
                Err(e) => {
                    warn!(%day, error = %e, "simulation halted");
                    self.state = SimulationState::Finished;
                    return Err(e);
                }
            }
            debug!(%day, eligible = weights.len(), fills = fills.len(), equity, "rebalanced");
            self.last_weights = weights.clone();
        }

        let equity = self.portfolio.total_equity();
        self.portfolio.record_equity(day, equity);

        self.cursor += 1;
        if self.cursor >= self.days.len() {
            self.state = SimulationState::Finished;
        }

        let (gross_exposure, net_exposure) = if equity != 0.0 {
            (
                self.portfolio.gross_exposure() / equity,
                self.portfolio.positions_value() / equity,
            )
        } else {
            (0.0, 0.0)
        };

        Ok(Some(DayReport {
            date: day,
            equity,
            cash: self.portfolio.cash,
            gross_exposure,
            net_exposure,
            weights,
            fills,
            excluded,
        }))
    }

    /// Drive the simulation to the end of the window.
    pub fn run(&mut self) -> Result<SimulationResult, MeanrevError> {
        info!(
            start = %self.config.start_date,
            end = %self.config.end_date,
            days = self.remaining_days(),
            instruments = self.history.instrument_count(),
            "simulation started"
        );

        let mut days = Vec::with_capacity(self.remaining_days());
        while let Some(report) = self.step()? {
            days.push(report);
        }

        info!(
            equity = self.portfolio.total_equity(),
            fills = self.portfolio.fills.len(),
            "simulation finished"
        );

        Ok(SimulationResult {
            portfolio: self.portfolio.clone(),
            days,
            final_weights: self.last_weights.clone(),
        })
    }
}

/// Run a full simulation over `history`.
pub fn run_simulation(
    history: &PriceHistory,
    config: &SimulationConfig,
) -> Result<SimulationResult, MeanrevError> {
    Simulator::new(history, config.clone())?.run()
}

/// Lazy `(day, equity)` sequence. Every call to [`EquityCurve::iter`] replays
/// the simulation from the initial capital.
#[derive(Debug, Clone)]
pub struct EquityCurve<'a> {
    history: &'a PriceHistory,
    config: SimulationConfig,
}

impl<'a> EquityCurve<'a> {
    pub fn new(history: &'a PriceHistory, config: SimulationConfig) -> Result<Self, MeanrevError> {
        config.check()?;
        Ok(Self { history, config })
    }

    pub fn iter(&self) -> EquityIter<'a> {
        EquityIter {
            simulator: Simulator::start(self.history, self.config.clone()),
        }
    }
}

impl<'a> IntoIterator for &EquityCurve<'a> {
    type Item = Result<EquityPoint, MeanrevError>;
    type IntoIter = EquityIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Yields one point per simulated day; a fatal error is yielded once, then the
/// iterator ends.
pub struct EquityIter<'a> {
    simulator: Simulator<'a>,
}

impl Iterator for EquityIter<'_> {
    type Item = Result<EquityPoint, MeanrevError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.simulator.step() {
            Ok(Some(report)) => Some(Ok(EquityPoint {
                date: report.date,
                equity: report.equity,
            })),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.simulator.remaining_days()))
    }
}

impl FusedIterator for EquityIter<'_> {}
