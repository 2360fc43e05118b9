//! Close-on-close order filling.
//!
//! Target weights become target quantities against current equity, and the
//! difference to the held quantity is filled in full at the day's close. There is
//! no commission, slippage or partial fill.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::MeanrevError;
use super::portfolio::Portfolio;
use super::position::{Fill, Position};

/// Quantity that puts `weight * equity` into an instrument at `price`.
pub fn target_quantity(weight: f64, equity: f64, price: f64) -> f64 {
    weight * equity / price
}

/// Move one instrument to `target` shares at `price`.
///
/// Returns the fill, or `None` when the position is already at target. Cash moves
/// by `-delta * price`; the position keeps its entry even when flat so that its
/// last fill stays visible.
pub fn fill_to_target(
    portfolio: &mut Portfolio,
    instrument: &str,
    target: f64,
    price: f64,
    date: NaiveDate,
) -> Option<Fill> {
    let current = portfolio.quantity(instrument);
    let delta = target - current;
    if delta == 0.0 {
        return None;
    }

    portfolio.cash -= delta * price;

    let position = portfolio
        .positions
        .entry(instrument.to_string())
        .or_insert_with(|| Position {
            instrument: instrument.to_string(),
            quantity: 0.0,
            last_fill_price: price,
            last_fill_date: date,
            mark_price: price,
        });
    position.quantity = target;
    position.last_fill_price = price;
    position.last_fill_date = date;
    position.mark_price = price;

    let fill = Fill {
        date,
        instrument: instrument.to_string(),
        quantity: delta,
        price,
        resulting_quantity: target,
    };
    portfolio.record_fill(fill.clone());
    Some(fill)
}

/// Rebalance every weighted instrument against `equity`.
///
/// `equity` is measured once before any fill; under close fills it does not move
/// as orders execute. Instruments are filled in ascending identifier order.
/// Non-positive equity halts with `ZeroEquity`.
pub fn rebalance<F>(
    portfolio: &mut Portfolio,
    weights: &BTreeMap<String, f64>,
    close: F,
    equity: f64,
    date: NaiveDate,
) -> Result<Vec<Fill>, MeanrevError>
where
    F: Fn(&str) -> Option<f64>,
{
    if equity <= 0.0 || !equity.is_finite() {
        return Err(MeanrevError::ZeroEquity { day: date, equity });
    }

    let mut fills = Vec::with_capacity(weights.len());
    for (instrument, &weight) in weights {
        let Some(price) = close(instrument) else {
            continue;
        };
        let target = target_quantity(weight, equity, price);
        if let Some(fill) = fill_to_target(portfolio, instrument, target, price, date) {
            fills.push(fill);
        }
    }
    Ok(fills)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn weights(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
        values.iter().map(|(c, w)| (c.to_string(), *w)).collect()
    }

    #[test]
    fn target_quantity_basic() {
        assert_relative_eq!(target_quantity(0.5, 1_000_000.0, 90.0), 500_000.0 / 90.0);
        assert_relative_eq!(target_quantity(-0.5, 1_000_000.0, 110.0), -500_000.0 / 110.0);
    }

    #[test]
    fn fill_to_target_opens_long() {
        let mut portfolio = Portfolio::new(10_000.0);
        let fill = fill_to_target(&mut portfolio, "AAPL", 10.0, 100.0, date()).unwrap();

        assert_eq!(fill.quantity, 10.0);
        assert_eq!(fill.resulting_quantity, 10.0);
        assert!((portfolio.cash - 9_000.0).abs() < f64::EPSILON);
        let pos = portfolio.get_position("AAPL").unwrap();
        assert_eq!(pos.quantity, 10.0);
        assert_eq!(pos.last_fill_price, 100.0);
        assert_eq!(portfolio.fills.len(), 1);
    }

    #[test]
    fn fill_to_target_opens_short_and_raises_cash() {
        let mut portfolio = Portfolio::new(10_000.0);
        fill_to_target(&mut portfolio, "MSFT", -5.0, 200.0, date()).unwrap();

        assert!((portfolio.cash - 11_000.0).abs() < f64::EPSILON);
        assert!(portfolio.get_position("MSFT").unwrap().quantity < 0.0);
        assert!((portfolio.total_equity() - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fill_to_target_trades_only_the_delta() {
        let mut portfolio = Portfolio::new(10_000.0);
        fill_to_target(&mut portfolio, "AAPL", 10.0, 100.0, date()).unwrap();
        let fill = fill_to_target(&mut portfolio, "AAPL", -4.0, 120.0, date()).unwrap();

        assert_eq!(fill.quantity, -14.0);
        // 10_000 - 1_000 + 14 * 120
        assert!((portfolio.cash - 10_680.0).abs() < 1e-9);
        assert_eq!(portfolio.quantity("AAPL"), -4.0);
    }

    #[test]
    fn fill_to_target_no_op_at_target() {
        let mut portfolio = Portfolio::new(10_000.0);
        fill_to_target(&mut portfolio, "AAPL", 10.0, 100.0, date()).unwrap();
        assert!(fill_to_target(&mut portfolio, "AAPL", 10.0, 105.0, date()).is_none());
        assert_eq!(portfolio.fills.len(), 1);
    }

    #[test]
    fn rebalance_two_instrument_example() {
        let mut portfolio = Portfolio::new(1_000_000.0);
        let w = weights(&[("A", -0.5), ("B", 0.5)]);
        let close = |code: &str| match code {
            "A" => Some(110.0),
            "B" => Some(90.0),
            _ => None,
        };

        let fills = rebalance(&mut portfolio, &w, close, 1_000_000.0, date()).unwrap();

        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].instrument, "A");
        assert_relative_eq!(portfolio.quantity("A"), -0.5 * 1_000_000.0 / 110.0);
        assert_relative_eq!(portfolio.quantity("B"), 0.5 * 1_000_000.0 / 90.0);
        assert_relative_eq!(portfolio.cash, 1_000_000.0, max_relative = 1e-12);
        assert_relative_eq!(portfolio.total_equity(), 1_000_000.0, max_relative = 1e-12);
    }

    #[test]
    fn rebalance_zero_weight_flattens() {
        let mut portfolio = Portfolio::new(1_000.0);
        fill_to_target(&mut portfolio, "A", 5.0, 10.0, date()).unwrap();
        let w = weights(&[("A", 0.0)]);

        rebalance(&mut portfolio, &w, |_| Some(12.0), 1_010.0, date()).unwrap();

        assert_eq!(portfolio.quantity("A"), 0.0);
        assert!((portfolio.cash - 1_010.0).abs() < 1e-9);
    }

    #[test]
    fn rebalance_rejects_non_positive_equity() {
        let mut portfolio = Portfolio::new(1_000.0);
        let w = weights(&[("A", 1.0)]);

        let err = rebalance(&mut portfolio, &w, |_| Some(10.0), 0.0, date()).unwrap_err();
        assert!(matches!(err, MeanrevError::ZeroEquity { day, .. } if day == date()));
        assert!(portfolio.fills.is_empty());

        let err = rebalance(&mut portfolio, &w, |_| Some(10.0), -5.0, date()).unwrap_err();
        assert!(matches!(err, MeanrevError::ZeroEquity { equity, .. } if equity == -5.0));
    }
}
