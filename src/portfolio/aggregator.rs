//! Portfolio metric derivation
//!
//! Pure functions over position snapshots; nothing here mutates or
//! persists, and the same input always yields the same report. Open
//! positions only; monetary outputs are 2 dp round-half-up while
//! percentages keep their precision until display.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::Position;
use crate::money::Money;

/// Derived view of one open position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionMetrics {
    pub symbol: String,
    pub quantity: u64,
    pub avg_price: Decimal,
    pub current_price: Option<Decimal>,
    pub invested: Money,
    pub current_value: Money,
    pub unrealized_pnl: Money,
    pub unrealized_pnl_pct: Decimal,
    pub realized_pnl: Money,
    pub total_pnl: Money,
    /// Per-share move against the previous close (the average price
    /// when no close is known). Zero until a price has been pushed.
    pub day_change: Decimal,
    pub day_change_pct: Decimal,
    pub day_pnl: Money,
    /// Share of total position value, filled in during aggregation.
    pub weightage: Decimal,
}

/// Account-level aggregates over the open positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioTotals {
    pub cash_balance: Money,
    pub invested: Money,
    pub current_value: Money,
    pub unrealized_pnl: Money,
    pub realized_pnl: Money,
    pub total_pnl: Money,
    pub day_pnl: Money,
    pub portfolio_value: Money,
    /// Percentage of open positions whose total P&L is positive.
    pub win_rate: Decimal,
    pub invested_allocation: Decimal,
    pub cash_allocation: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskMetrics {
    /// Largest single position as a share of total portfolio value.
    pub concentration: Decimal,
    /// Population standard deviation of the per-position day moves.
    pub volatility: Decimal,
    /// 0..=100, ten points per position minus concentration.
    pub diversification_score: Decimal,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    /// Open positions, largest value first.
    pub positions: Vec<PositionMetrics>,
    pub totals: PortfolioTotals,
    pub risk: RiskMetrics,
}

/// Metrics for a single position, before weightage is known.
pub fn position_metrics(position: &Position) -> PositionMetrics {
    let invested = position.total_invested;
    let current_value = position.market_value();
    let unrealized = position.unrealized_pnl();
    let unrealized_pct = if invested.is_zero() {
        Decimal::ZERO
    } else {
        unrealized.as_decimal() / invested.as_decimal() * Decimal::ONE_HUNDRED
    };

    let (day_change, day_change_pct, day_pnl) = match position.current_price {
        Some(current) => {
            let base = position.previous_close.unwrap_or(position.avg_price);
            let change = current - base;
            let pct = if base.is_zero() {
                Decimal::ZERO
            } else {
                change / base * Decimal::ONE_HUNDRED
            };
            (
                change,
                pct,
                Money::from_decimal(change * Decimal::from(position.quantity)),
            )
        }
        None => (Decimal::ZERO, Decimal::ZERO, Money::ZERO),
    };

    PositionMetrics {
        symbol: position.symbol.clone(),
        quantity: position.quantity,
        avg_price: position.avg_price,
        current_price: position.current_price,
        invested,
        current_value,
        unrealized_pnl: unrealized,
        unrealized_pnl_pct: unrealized_pct,
        realized_pnl: position.realized_pnl,
        total_pnl: unrealized + position.realized_pnl,
        day_change,
        day_change_pct,
        day_pnl,
        weightage: Decimal::ZERO,
    }
}

/// Full report over an account's positions and cash. Closed positions
/// are excluded; an account with none yields the zero report with the
/// whole allocation in cash.
pub fn build_report(positions: &[Position], cash_balance: Money) -> PortfolioReport {
    let mut metrics: Vec<PositionMetrics> = positions
        .iter()
        .filter(|p| p.is_open())
        .map(position_metrics)
        .collect();
    metrics.sort_by(|a, b| b.current_value.cmp(&a.current_value).then(a.symbol.cmp(&b.symbol)));

    let invested: Money = metrics.iter().map(|m| m.invested).sum();
    let current_value: Money = metrics.iter().map(|m| m.current_value).sum();
    let realized: Money = metrics.iter().map(|m| m.realized_pnl).sum();
    let day_pnl: Money = metrics.iter().map(|m| m.day_pnl).sum();
    let unrealized = current_value - invested;
    let portfolio_value = cash_balance + current_value;

    for metric in &mut metrics {
        metric.weightage = if current_value.is_zero() {
            Decimal::ZERO
        } else {
            metric.current_value.as_decimal() / current_value.as_decimal() * Decimal::ONE_HUNDRED
        };
    }

    let win_rate = if metrics.is_empty() {
        Decimal::ZERO
    } else {
        let profitable = metrics.iter().filter(|m| m.total_pnl > Money::ZERO).count();
        Decimal::from(profitable) / Decimal::from(metrics.len()) * Decimal::ONE_HUNDRED
    };

    let invested_allocation = if portfolio_value.is_zero() {
        Decimal::ZERO
    } else {
        current_value.as_decimal() / portfolio_value.as_decimal() * Decimal::ONE_HUNDRED
    };
    let cash_allocation = Decimal::ONE_HUNDRED - invested_allocation;

    let totals = PortfolioTotals {
        cash_balance,
        invested,
        current_value,
        unrealized_pnl: unrealized,
        realized_pnl: realized,
        total_pnl: unrealized + realized,
        day_pnl,
        portfolio_value,
        win_rate,
        invested_allocation,
        cash_allocation,
    };

    let risk = risk_metrics(&metrics, portfolio_value);

    PortfolioReport {
        positions: metrics,
        totals,
        risk,
    }
}

fn risk_metrics(metrics: &[PositionMetrics], portfolio_value: Money) -> RiskMetrics {
    let concentration = if portfolio_value.is_zero() {
        Decimal::ZERO
    } else {
        let largest = metrics
            .iter()
            .map(|m| m.current_value)
            .max()
            .unwrap_or(Money::ZERO);
        largest.as_decimal() / portfolio_value.as_decimal() * Decimal::ONE_HUNDRED
    };

    let volatility = day_change_stddev(metrics);

    let diversification_score = (Decimal::from(metrics.len() as u64 * 10) - concentration)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

    let risk_level = if concentration > Decimal::from(50) || volatility > Decimal::from(15) {
        RiskLevel::High
    } else if concentration > Decimal::from(30) || volatility > Decimal::from(10) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskMetrics {
        concentration,
        volatility,
        diversification_score,
        risk_level,
    }
}

/// Population stddev of the day move percentages, through f64 for the
/// square root.
fn day_change_stddev(metrics: &[PositionMetrics]) -> Decimal {
    let samples: Vec<f64> = metrics
        .iter()
        .filter_map(|m| m.day_change_pct.to_f64())
        .collect();
    if samples.len() < 2 {
        return Decimal::ZERO;
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Decimal::from_f64(variance.sqrt())
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(
        symbol: &str,
        quantity: u64,
        avg_price: Decimal,
        current: Option<Decimal>,
        previous_close: Option<Decimal>,
    ) -> Position {
        let mut p = Position::new(symbol);
        p.quantity = quantity;
        p.avg_price = avg_price;
        p.total_invested = Money::from_decimal(avg_price * Decimal::from(quantity));
        p.current_price = current;
        p.previous_close = previous_close;
        p
    }

    #[test]
    fn empty_portfolio_is_all_cash() {
        let report = build_report(&[], Money::from_decimal(dec!(10000)));
        assert!(report.positions.is_empty());
        assert_eq!(report.totals.invested, Money::ZERO);
        assert_eq!(report.totals.portfolio_value, Money::from_decimal(dec!(10000)));
        assert_eq!(report.totals.win_rate, Decimal::ZERO);
        assert_eq!(report.totals.cash_allocation, dec!(100));
        assert_eq!(report.risk.concentration, Decimal::ZERO);
        assert_eq!(report.risk.diversification_score, Decimal::ZERO);
        assert_eq!(report.risk.risk_level, RiskLevel::Low);
    }

    #[test]
    fn closed_positions_are_excluded() {
        let mut closed = Position::new("OLD");
        closed.realized_pnl = Money::from_decimal(dec!(500));
        let open = position("TCS", 10, dec!(100), None, None);

        let report = build_report(&[closed, open], Money::ZERO);
        assert_eq!(report.positions.len(), 1);
        assert_eq!(report.positions[0].symbol, "TCS");
        // realized P&L of closed positions does not leak into the totals
        assert_eq!(report.totals.realized_pnl, Money::ZERO);
    }

    #[test]
    fn unpushed_price_reads_as_cost_basis() {
        let report = build_report(
            &[position("TCS", 10, dec!(100), None, None)],
            Money::from_decimal(dec!(9000)),
        );
        let m = &report.positions[0];
        assert_eq!(m.current_value, m.invested);
        assert_eq!(m.unrealized_pnl, Money::ZERO);
        assert_eq!(m.day_change, Decimal::ZERO);
        assert_eq!(m.day_pnl, Money::ZERO);
        assert_eq!(m.weightage, dec!(100));
    }

    #[test]
    fn metrics_aggregate_over_two_positions() {
        // A: 10 @ 100, marked 110 after a 105 close. B: 5 @ 200, marked 180.
        let positions = vec![
            position("AAA", 10, dec!(100), Some(dec!(110)), Some(dec!(105))),
            position("BBB", 5, dec!(200), Some(dec!(180)), None),
        ];
        let report = build_report(&positions, Money::from_decimal(dec!(8000)));

        // sorted by value: AAA 1100 over BBB 900
        assert_eq!(report.positions[0].symbol, "AAA");
        let a = &report.positions[0];
        let b = &report.positions[1];

        assert_eq!(a.unrealized_pnl, Money::from_decimal(dec!(100)));
        assert_eq!(a.unrealized_pnl_pct, dec!(10));
        assert_eq!(a.day_change, dec!(5));
        assert_eq!(a.day_change_pct.round_dp(2), dec!(4.76));
        assert_eq!(a.day_pnl, Money::from_decimal(dec!(50)));
        assert_eq!(a.weightage, dec!(55));

        // no previous close: the average price is the day base
        assert_eq!(b.day_change, dec!(-20));
        assert_eq!(b.day_change_pct, dec!(-10));
        assert_eq!(b.day_pnl, Money::from_decimal(dec!(-100)));
        assert_eq!(b.weightage, dec!(45));

        let totals = &report.totals;
        assert_eq!(totals.invested, Money::from_decimal(dec!(2000)));
        assert_eq!(totals.current_value, Money::from_decimal(dec!(2000)));
        assert_eq!(totals.unrealized_pnl, Money::ZERO);
        assert_eq!(totals.day_pnl, Money::from_decimal(dec!(-50)));
        assert_eq!(totals.portfolio_value, Money::from_decimal(dec!(10000)));
        assert_eq!(totals.win_rate, dec!(50));
        assert_eq!(totals.invested_allocation, dec!(20));
        assert_eq!(totals.cash_allocation, dec!(80));

        // concentration 11%, two positions, modest day moves
        assert_eq!(report.risk.concentration, dec!(11));
        assert_eq!(report.risk.diversification_score, dec!(9));
        assert_eq!(report.risk.volatility, dec!(7.38));
        assert_eq!(report.risk.risk_level, RiskLevel::Low);
    }

    #[test]
    fn report_is_deterministic() {
        let positions = vec![
            position("AAA", 10, dec!(100), Some(dec!(110)), Some(dec!(105))),
            position("BBB", 5, dec!(200), Some(dec!(180)), None),
        ];
        let cash = Money::from_decimal(dec!(8000));
        assert_eq!(build_report(&positions, cash), build_report(&positions, cash));
    }

    #[test]
    fn concentration_drives_risk_up() {
        // one position is the entire portfolio
        let all_in = build_report(
            &[position("AAA", 10, dec!(100), Some(dec!(100)), None)],
            Money::ZERO,
        );
        assert_eq!(all_in.risk.concentration, dec!(100));
        assert_eq!(all_in.risk.diversification_score, Decimal::ZERO);
        assert_eq!(all_in.risk.risk_level, RiskLevel::High);

        // 1000 of 2500 is 40%
        let heavy = build_report(
            &[position("AAA", 10, dec!(100), Some(dec!(100)), None)],
            Money::from_decimal(dec!(1500)),
        );
        assert_eq!(heavy.risk.concentration, dec!(40));
        assert_eq!(heavy.risk.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn volatile_day_moves_drive_risk_up() {
        // tiny allocations but +/-20% day swings
        let report = build_report(
            &[
                position("AAA", 1, dec!(100), Some(dec!(120)), Some(dec!(100))),
                position("BBB", 1, dec!(100), Some(dec!(80)), Some(dec!(100))),
            ],
            Money::from_decimal(dec!(9800)),
        );
        assert_eq!(report.risk.volatility, dec!(20));
        assert_eq!(report.risk.risk_level, RiskLevel::High);
    }
}
