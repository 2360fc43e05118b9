//! Position tracking and fill records.

use chrono::NaiveDate;

/// Holding in one instrument. Quantity is signed and may be fractional.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub instrument: String,
    pub quantity: f64,
    pub last_fill_price: f64,
    pub last_fill_date: NaiveDate,
    /// Most recent close used to value the position.
    pub mark_price: f64,
}

impl Position {
    /// Signed value at `price`; negative for shorts.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    /// Signed value at the last mark.
    pub fn marked_value(&self) -> f64 {
        self.market_value(self.mark_price)
    }
}

/// One executed trade delta at the close.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: NaiveDate,
    pub instrument: String,
    /// Signed traded quantity: positive buys, negative sells.
    pub quantity: f64,
    pub price: f64,
    /// Quantity held after the fill.
    pub resulting_quantity: f64,
}

impl Fill {
    /// Cash leaving the account; negative when the fill raises cash.
    pub fn cash_outflow(&self) -> f64 {
        self.quantity * self.price
    }

    pub fn notional(&self) -> f64 {
        self.cash_outflow().abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn sample_long_position() -> Position {
        Position {
            instrument: "AAPL".into(),
            quantity: 100.0,
            last_fill_price: 50.0,
            last_fill_date: day(),
            mark_price: 50.0,
        }
    }

    fn sample_short_position() -> Position {
        Position {
            instrument: "MSFT".into(),
            quantity: -40.5,
            last_fill_price: 100.0,
            last_fill_date: day(),
            mark_price: 102.0,
        }
    }

    #[test]
    fn market_value_long() {
        let pos = sample_long_position();
        assert!((pos.market_value(55.0) - 5500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn market_value_short_is_negative() {
        let pos = sample_short_position();
        assert!((pos.market_value(100.0) - (-4050.0)).abs() < 1e-9);
        assert!((pos.marked_value() - (-40.5 * 102.0)).abs() < 1e-9);
    }

    #[test]
    fn fill_cash_outflow_sign() {
        let buy = Fill {
            date: day(),
            instrument: "AAPL".into(),
            quantity: 10.0,
            price: 20.0,
            resulting_quantity: 10.0,
        };
        assert!((buy.cash_outflow() - 200.0).abs() < f64::EPSILON);

        let sell = Fill {
            quantity: -10.0,
            resulting_quantity: 0.0,
            ..buy
        };
        assert!((sell.cash_outflow() - (-200.0)).abs() < f64::EPSILON);
        assert!((sell.notional() - 200.0).abs() < f64::EPSILON);
    }
}
