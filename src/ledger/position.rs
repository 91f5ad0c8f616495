//! Per-symbol holdings with weighted-average cost

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Holdings in a single symbol within one account.
///
/// A position is retained after it is fully sold (quantity 0) so the
/// symbol's realized P&L stays queryable. Invariants maintained by the
/// ledger: `quantity == 0` implies `avg_price == 0` and
/// `total_invested == 0`, and `quantity * avg_price` rounds to
/// `total_invested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
    /// Weighted-average cost per share, fees included. Full precision;
    /// rounding would drift across repeated buys.
    pub avg_price: Decimal,
    /// Capital currently tied up in the position, fees included.
    pub total_invested: Money,
    /// Cumulative profit locked in by sells of this symbol.
    pub realized_pnl: Money,
    /// Last pushed market price. May be stale; `None` until the first push.
    pub current_price: Option<Decimal>,
    /// Previous session close, pushed alongside prices when known.
    pub previous_close: Option<Decimal>,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    /// Zero-valued position for a symbol that has never traded.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0,
            avg_price: Decimal::ZERO,
            total_invested: Money::ZERO,
            realized_pnl: Money::ZERO,
            current_price: None,
            previous_close: None,
            last_updated: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.quantity > 0
    }

    /// Market value at the last pushed price; `None` before the first push.
    pub fn current_value(&self) -> Option<Money> {
        self.current_price
            .map(|price| Money::from_decimal(Decimal::from(self.quantity) * price))
    }

    /// Market value, falling back to cost basis when no price has been
    /// pushed yet. Unrealized P&L therefore reads zero until a price
    /// arrives.
    pub fn market_value(&self) -> Money {
        self.current_value().unwrap_or(self.total_invested)
    }

    /// Unrealized P&L against the last pushed price.
    pub fn unrealized_pnl(&self) -> Money {
        self.market_value() - self.total_invested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_position_is_zero_valued() {
        let p = Position::new("RELIANCE");
        assert_eq!(p.quantity, 0);
        assert_eq!(p.avg_price, Decimal::ZERO);
        assert_eq!(p.total_invested, Money::ZERO);
        assert!(!p.is_open());
        assert_eq!(p.current_value(), None);
    }

    #[test]
    fn market_value_falls_back_to_cost_basis() {
        let mut p = Position::new("TCS");
        p.quantity = 10;
        p.avg_price = dec!(100.125);
        p.total_invested = Money::from_decimal(dec!(1001.25));

        assert_eq!(p.market_value(), p.total_invested);
        assert_eq!(p.unrealized_pnl(), Money::ZERO);

        p.current_price = Some(dec!(110));
        assert_eq!(p.market_value().as_decimal(), dec!(1100));
        assert_eq!(p.unrealized_pnl().as_decimal(), dec!(98.75));
    }
}
