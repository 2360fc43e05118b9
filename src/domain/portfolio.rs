//! Portfolio state and equity tracking.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::position::{Fill, Position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            fills: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn get_position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    /// Held quantity, zero when there is no position.
    pub fn quantity(&self, instrument: &str) -> f64 {
        self.positions
            .get(instrument)
            .map(|p| p.quantity)
            .unwrap_or(0.0)
    }

    pub fn record_fill(&mut self, fill: Fill) {
        self.fills.push(fill);
    }

    pub fn record_equity(&mut self, date: NaiveDate, equity: f64) {
        self.equity_curve.push(EquityPoint { date, equity });
    }

    /// Update mark prices from a day's closes. Instruments without a close keep
    /// their previous mark.
    pub fn mark_to_market<F>(&mut self, close: F)
    where
        F: Fn(&str) -> Option<f64>,
    {
        for pos in self.positions.values_mut() {
            if let Some(price) = close(&pos.instrument) {
                pos.mark_price = price;
            }
        }
    }

    /// Signed value of all positions at their current marks.
    pub fn positions_value(&self) -> f64 {
        self.positions
            .values()
            .map(Position::marked_value)
            .fold(0.0, |acc, v| acc + v)
    }

    /// Cash plus marked value of every position.
    pub fn total_equity(&self) -> f64 {
        self.cash + self.positions_value()
    }

    /// Σ|value| over positions.
    pub fn gross_exposure(&self) -> f64 {
        self.positions
            .values()
            .map(|p| p.marked_value().abs())
            .fold(0.0, |acc, v| acc + v)
    }

    /// Total traded notional over the run.
    pub fn turnover(&self) -> f64 {
        self.fills.iter().map(Fill::notional).fold(0.0, |acc, v| acc + v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn sample_position(instrument: &str, quantity: f64, mark_price: f64) -> Position {
        Position {
            instrument: instrument.to_string(),
            quantity,
            last_fill_price: 100.0,
            last_fill_date: day(),
            mark_price,
        }
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100000.0);
        assert!((portfolio.cash - 100000.0).abs() < f64::EPSILON);
        assert!((portfolio.initial_capital - 100000.0).abs() < f64::EPSILON);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.fills.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn quantity_defaults_to_zero() {
        let mut portfolio = Portfolio::new(1000.0);
        assert_eq!(portfolio.quantity("AAPL"), 0.0);
        portfolio
            .positions
            .insert("AAPL".into(), sample_position("AAPL", 3.5, 10.0));
        assert_eq!(portfolio.quantity("AAPL"), 3.5);
        assert!(portfolio.get_position("AAPL").is_some());
        assert_eq!(portfolio.positions.len(), 1);
    }

    #[test]
    fn record_equity() {
        let mut portfolio = Portfolio::new(100000.0);
        portfolio.record_equity(day(), 105000.0);
        assert_eq!(portfolio.equity_curve.len(), 1);
        assert_eq!(portfolio.equity_curve[0].date, day());
        assert!((portfolio.equity_curve[0].equity - 105000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_equity_no_positions() {
        let portfolio = Portfolio::new(100000.0);
        assert!((portfolio.total_equity() - 100000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_equity_long_and_short() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio
            .positions
            .insert("A".into(), sample_position("A", 10.0, 20.0));
        portfolio
            .positions
            .insert("B".into(), sample_position("B", -5.0, 40.0));
        portfolio.cash = 1000.0;

        // 1000 + 200 - 200
        assert!((portfolio.total_equity() - 1000.0).abs() < f64::EPSILON);
        assert!((portfolio.gross_exposure() - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mark_to_market_keeps_stale_price_when_close_missing() {
        let mut portfolio = Portfolio::new(0.0);
        portfolio
            .positions
            .insert("A".into(), sample_position("A", 1.0, 20.0));
        portfolio
            .positions
            .insert("B".into(), sample_position("B", 1.0, 30.0));

        portfolio.mark_to_market(|code| (code == "A").then_some(25.0));

        assert_eq!(portfolio.get_position("A").unwrap().mark_price, 25.0);
        assert_eq!(portfolio.get_position("B").unwrap().mark_price, 30.0);
        assert!((portfolio.total_equity() - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn turnover_sums_fill_notional() {
        let mut portfolio = Portfolio::new(0.0);
        portfolio.record_fill(Fill {
            date: day(),
            instrument: "A".into(),
            quantity: 2.0,
            price: 10.0,
            resulting_quantity: 2.0,
        });
        portfolio.record_fill(Fill {
            date: day(),
            instrument: "B".into(),
            quantity: -3.0,
            price: 5.0,
            resulting_quantity: -3.0,
        });
        assert!((portfolio.turnover() - 35.0).abs() < f64::EPSILON);
    }
}
