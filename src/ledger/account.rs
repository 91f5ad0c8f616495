//! Single-account trading ledger
//!
//! `Account` is the pure in-memory state machine: cash, positions and
//! trade history, mutated only through `execute_trade` and
//! `apply_price`. Every operation validates fully before touching any
//! field, so a failed call leaves the account bit-for-bit unchanged.
//! Persistence and event publication sit in the service layer above.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use uuid::Uuid;

use crate::fees::FeeCalculator;
use crate::ledger::position::Position;
use crate::ledger::trade::{OrderSide, Trade, TradeRequest, TradeStatus};
use crate::money::Money;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("quantity must be a positive whole number, got {quantity}")]
    InvalidQuantity { quantity: u64 },
    #[error("price must be positive, got {price}")]
    InvalidPrice { price: Decimal },
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Money, available: Money },
    #[error("insufficient holdings in {symbol}: tried to sell {required}, holding {available}")]
    InsufficientHoldings {
        symbol: String,
        required: u64,
        available: u64,
    },
    #[error("user id {user_id:?} is invalid: use letters, digits, '-' or '_'")]
    InvalidUserId { user_id: String },
    #[error("account {user_id} not found")]
    AccountNotFound { user_id: String },
    #[error("account {user_id} already exists")]
    AccountExists { user_id: String },
    #[error("ledger service unavailable")]
    ServiceUnavailable,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::EmptySymbol => "EMPTY_SYMBOL",
            LedgerError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            LedgerError::InvalidPrice { .. } => "INVALID_PRICE",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::InsufficientHoldings { .. } => "INSUFFICIENT_HOLDINGS",
            LedgerError::InvalidUserId { .. } => "INVALID_USER_ID",
            LedgerError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            LedgerError::AccountExists { .. } => "ACCOUNT_EXISTS",
            LedgerError::ServiceUnavailable => "INFRASTRUCTURE",
            LedgerError::Store(_) => "INFRASTRUCTURE",
        }
    }

    /// Infrastructure failures may be retried with the same idempotency
    /// key; business failures are terminal for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::ServiceUnavailable | LedgerError::Store(_)
        )
    }
}

/// Result of a successful trade execution.
#[derive(Debug, Clone, Serialize)]
pub struct TradeOutcome {
    pub trade: Trade,
    pub position: Position,
    pub cash_balance: Money,
}

/// Aggregate view over the open positions of one account.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub cash_balance: Money,
    pub total_invested: Money,
    /// Market value of open positions; positions without a pushed price
    /// contribute their cost basis.
    pub total_current_value: Money,
    pub total_realized_pnl: Money,
    pub total_unrealized_pnl: Money,
    /// Cash plus current value of open positions.
    pub total_portfolio_value: Money,
}

/// One user's trading ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub cash_balance: Money,
    /// One entry per ever-traded symbol; closed positions stay with
    /// quantity 0.
    pub positions: HashMap<String, Position>,
    /// Most recent first, capped by the configured history limit.
    pub trade_history: VecDeque<Trade>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: impl Into<String>, starting_cash: Money) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            cash_balance: starting_cash,
            positions: HashMap::new(),
            trade_history: VecDeque::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Execute a validated buy or sell against this account.
    ///
    /// On success the trade is appended to the history (oldest entry
    /// evicted past `history_limit`) and the affected position and cash
    /// balance are returned. On any error nothing is mutated.
    pub fn execute_trade(
        &mut self,
        request: &TradeRequest,
        fees: &FeeCalculator,
        history_limit: usize,
    ) -> Result<TradeOutcome, LedgerError> {
        if request.symbol.trim().is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        if request.quantity == 0 {
            return Err(LedgerError::InvalidQuantity { quantity: 0 });
        }
        if request.price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                price: request.price,
            });
        }

        let now = Utc::now();
        let trade_value_raw = request.price * Decimal::from(request.quantity);
        let charges = fees.charges(trade_value_raw, request.side);
        let trade_value = Money::from_decimal(trade_value_raw);

        let (position, total_cost, realized_pnl) = match request.side {
            OrderSide::Buy => self.apply_buy(request, trade_value, charges.total, now)?,
            OrderSide::Sell => self.apply_sell(request, trade_value, charges.total, now)?,
        };

        let trade = Trade {
            id: Uuid::new_v4(),
            symbol: request.symbol.clone(),
            quantity: request.quantity,
            price: request.price,
            side: request.side,
            kind: request.kind,
            trade_value,
            brokerage: charges.brokerage,
            taxes: charges.taxes,
            total_cost,
            realized_pnl,
            executed_at: now,
            status: TradeStatus::Executed,
            order_id: request.order_id,
        };

        self.trade_history.push_front(trade.clone());
        self.trade_history.truncate(history_limit);
        self.last_updated = now;

        Ok(TradeOutcome {
            trade,
            position,
            cash_balance: self.cash_balance,
        })
    }

    fn apply_buy(
        &mut self,
        request: &TradeRequest,
        trade_value: Money,
        charges: Money,
        now: DateTime<Utc>,
    ) -> Result<(Position, Money, Money), LedgerError> {
        let total_cost = trade_value + charges;
        if self.cash_balance < total_cost {
            return Err(LedgerError::InsufficientBalance {
                required: total_cost,
                available: self.cash_balance,
            });
        }

        let snapshot = {
            let position = self
                .positions
                .entry(request.symbol.clone())
                .or_insert_with(|| Position::new(request.symbol.clone()));
            position.quantity += request.quantity;
            position.total_invested += total_cost;
            position.avg_price =
                position.total_invested.as_decimal() / Decimal::from(position.quantity);
            position.last_updated = now;
            position.clone()
        };

        self.cash_balance -= total_cost;
        Ok((snapshot, total_cost, Money::ZERO))
    }

    fn apply_sell(
        &mut self,
        request: &TradeRequest,
        trade_value: Money,
        charges: Money,
        now: DateTime<Utc>,
    ) -> Result<(Position, Money, Money), LedgerError> {
        let Some(position) = self.positions.get_mut(&request.symbol) else {
            return Err(LedgerError::InsufficientHoldings {
                symbol: request.symbol.clone(),
                required: request.quantity,
                available: 0,
            });
        };
        if request.quantity > position.quantity {
            return Err(LedgerError::InsufficientHoldings {
                symbol: request.symbol.clone(),
                required: request.quantity,
                available: position.quantity,
            });
        }

        let proceeds = trade_value - charges;
        let remaining = position.quantity - request.quantity;
        // The retained basis is re-derived from avg_price so that
        // quantity * avg_price keeps rounding to total_invested; the
        // sub-cent residue of the pro-rata split lands in realized P&L.
        let retained = if remaining > 0 {
            Money::from_decimal(Decimal::from(remaining) * position.avg_price)
        } else {
            Money::ZERO
        };
        let sold_cost_basis = position.total_invested - retained;
        let realized = proceeds - sold_cost_basis;

        position.quantity = remaining;
        position.total_invested = retained;
        if remaining == 0 {
            position.avg_price = Decimal::ZERO;
        }
        position.realized_pnl += realized;
        position.last_updated = now;
        let snapshot = position.clone();

        self.cash_balance += proceeds;
        Ok((snapshot, proceeds, realized))
    }

    /// Stored position for a symbol, or a zero-valued one. Never fails.
    pub fn position(&self, symbol: &str) -> Position {
        self.positions
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Position::new(symbol))
    }

    /// Record a pushed market price against a position. No-op (returns
    /// `None`) if the symbol has never traded here. Prices are trusted
    /// as supplied.
    pub fn apply_price(
        &mut self,
        symbol: &str,
        price: Decimal,
        previous_close: Option<Decimal>,
    ) -> Option<Position> {
        let snapshot = {
            let position = self.positions.get_mut(symbol)?;
            position.current_price = Some(price);
            if previous_close.is_some() {
                position.previous_close = previous_close;
            }
            position.last_updated = Utc::now();
            position.clone()
        };
        self.last_updated = snapshot.last_updated;
        Some(snapshot)
    }

    /// Aggregate totals over open positions. Pure; two calls without an
    /// intervening mutation return identical output.
    pub fn summary(&self) -> PortfolioSummary {
        let mut total_invested = Money::ZERO;
        let mut total_current_value = Money::ZERO;
        let mut total_realized_pnl = Money::ZERO;

        for position in self.positions.values().filter(|p| p.is_open()) {
            total_invested += position.total_invested;
            total_current_value += position.market_value();
            total_realized_pnl += position.realized_pnl;
        }

        PortfolioSummary {
            cash_balance: self.cash_balance,
            total_invested,
            total_current_value,
            total_realized_pnl,
            total_unrealized_pnl: total_current_value - total_invested,
            total_portfolio_value: self.cash_balance + total_current_value,
        }
    }

    /// Most recent trades, newest first.
    pub fn recent_trades(&self, limit: Option<usize>) -> Vec<Trade> {
        let take = limit.unwrap_or(self.trade_history.len());
        self.trade_history.iter().take(take).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::trade::OrderKind;
    use rust_decimal_macros::dec;

    fn fees() -> FeeCalculator {
        FeeCalculator::default()
    }

    fn money(d: Decimal) -> Money {
        Money::from_decimal(d)
    }

    fn buy(symbol: &str, quantity: u64, price: Decimal) -> TradeRequest {
        TradeRequest {
            symbol: symbol.to_string(),
            quantity,
            price,
            side: OrderSide::Buy,
            kind: OrderKind::Market,
            order_id: None,
        }
    }

    fn sell(symbol: &str, quantity: u64, price: Decimal) -> TradeRequest {
        TradeRequest {
            symbol: symbol.to_string(),
            quantity,
            price,
            side: OrderSide::Sell,
            kind: OrderKind::Market,
            order_id: None,
        }
    }

    #[test]
    fn buy_debits_cash_and_builds_position() {
        let mut account = Account::new("u1", money(dec!(10000)));
        let outcome = account
            .execute_trade(&buy("RELIANCE", 10, dec!(100)), &fees(), 1000)
            .unwrap();

        assert_eq!(outcome.trade.trade_value, money(dec!(1000)));
        assert_eq!(outcome.trade.brokerage, money(dec!(1.00)));
        assert_eq!(outcome.trade.taxes, money(dec!(0.25)));
        assert_eq!(outcome.trade.total_cost, money(dec!(1001.25)));
        assert_eq!(outcome.trade.realized_pnl, Money::ZERO);

        assert_eq!(account.cash_balance, money(dec!(8998.75)));
        let position = account.position("RELIANCE");
        assert_eq!(position.quantity, 10);
        assert_eq!(position.avg_price, dec!(100.125));
        assert_eq!(position.total_invested, money(dec!(1001.25)));
    }

    #[test]
    fn second_buy_reweights_average_cost() {
        let mut account = Account::new("u1", money(dec!(10000)));
        account
            .execute_trade(&buy("TCS", 10, dec!(100)), &fees(), 1000)
            .unwrap();
        account
            .execute_trade(&buy("TCS", 10, dec!(110)), &fees(), 1000)
            .unwrap();

        // second leg: value 1100, brokerage 1.10, taxes 0.28
        let position = account.position("TCS");
        assert_eq!(position.quantity, 20);
        assert_eq!(position.total_invested, money(dec!(2102.63)));
        assert_eq!(position.avg_price, dec!(105.1315));
        assert_eq!(account.cash_balance, money(dec!(7897.37)));
    }

    #[test]
    fn sell_realizes_pnl_against_prorated_basis() {
        let mut account = Account::new("u1", Money::ZERO);
        let mut position = Position::new("INFY");
        position.quantity = 10;
        position.avg_price = dec!(100);
        position.total_invested = money(dec!(1000));
        account.positions.insert("INFY".to_string(), position);

        let outcome = account
            .execute_trade(&sell("INFY", 5, dec!(120)), &fees(), 1000)
            .unwrap();

        // value 600, brokerage 0.60, taxes 0.28, proceeds 599.12
        assert_eq!(outcome.trade.total_cost, money(dec!(599.12)));
        assert_eq!(outcome.trade.realized_pnl, money(dec!(99.12)));
        assert_eq!(account.cash_balance, money(dec!(599.12)));

        let position = account.position("INFY");
        assert_eq!(position.quantity, 5);
        assert_eq!(position.avg_price, dec!(100));
        assert_eq!(position.total_invested, money(dec!(500)));
        assert_eq!(position.realized_pnl, money(dec!(99.12)));
    }

    #[test]
    fn selling_out_resets_cost_fields_but_keeps_realized() {
        let mut account = Account::new("u1", money(dec!(10000)));
        account
            .execute_trade(&buy("WIPRO", 4, dec!(50)), &fees(), 1000)
            .unwrap();
        account
            .execute_trade(&sell("WIPRO", 4, dec!(55)), &fees(), 1000)
            .unwrap();

        let position = account.position("WIPRO");
        assert_eq!(position.quantity, 0);
        assert_eq!(position.avg_price, Decimal::ZERO);
        assert_eq!(position.total_invested, Money::ZERO);
        assert!(position.realized_pnl != Money::ZERO);

        // closed positions drop out of the summary
        let summary = account.summary();
        assert_eq!(summary.total_invested, Money::ZERO);
        assert_eq!(summary.total_current_value, Money::ZERO);
    }

    #[test]
    fn partial_sell_keeps_quantity_times_avg_consistent() {
        let mut account = Account::new("u1", money(dec!(10000)));
        account
            .execute_trade(&buy("HDFC", 10, dec!(100)), &fees(), 1000)
            .unwrap();
        account
            .execute_trade(&sell("HDFC", 5, dec!(120)), &fees(), 1000)
            .unwrap();

        let position = account.position("HDFC");
        // retained basis 500.63 (half of 1001.25, rounded); residue in P&L
        assert_eq!(position.total_invested, money(dec!(500.63)));
        assert_eq!(position.avg_price, dec!(100.125));
        assert_eq!(
            Money::from_decimal(Decimal::from(position.quantity) * position.avg_price),
            position.total_invested
        );
        assert_eq!(position.realized_pnl, money(dec!(98.50)));
        assert_eq!(account.cash_balance, money(dec!(9597.87)));
    }

    #[test]
    fn overselling_fails_and_leaves_account_untouched() {
        let mut account = Account::new("u1", money(dec!(10000)));
        account
            .execute_trade(&buy("SBIN", 5, dec!(200)), &fees(), 1000)
            .unwrap();
        let before = account.clone();

        let err = account
            .execute_trade(&sell("SBIN", 20, dec!(210)), &fees(), 1000)
            .unwrap_err();
        match err {
            LedgerError::InsufficientHoldings {
                required,
                available,
                ..
            } => {
                assert_eq!(required, 20);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(account, before);
    }

    #[test]
    fn selling_unknown_symbol_reports_zero_holdings() {
        let mut account = Account::new("u1", money(dec!(1000)));
        let err = account
            .execute_trade(&sell("NOPE", 1, dec!(10)), &fees(), 1000)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientHoldings { available: 0, .. }
        ));
    }

    #[test]
    fn buy_beyond_balance_fails_with_amounts() {
        let mut account = Account::new("u1", money(dec!(500)));
        let before = account.clone();

        let err = account
            .execute_trade(&buy("RELIANCE", 10, dec!(100)), &fees(), 1000)
            .unwrap_err();
        match err {
            LedgerError::InsufficientBalance {
                required,
                available,
            } => {
                assert_eq!(required, money(dec!(1001.25)));
                assert_eq!(available, money(dec!(500)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(account, before);
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn rejects_malformed_requests() {
        let mut account = Account::new("u1", money(dec!(1000)));
        let before = account.clone();

        assert!(matches!(
            account.execute_trade(&buy("  ", 1, dec!(10)), &fees(), 1000),
            Err(LedgerError::EmptySymbol)
        ));
        assert!(matches!(
            account.execute_trade(&buy("X", 0, dec!(10)), &fees(), 1000),
            Err(LedgerError::InvalidQuantity { quantity: 0 })
        ));
        assert!(matches!(
            account.execute_trade(&buy("X", 1, dec!(0)), &fees(), 1000),
            Err(LedgerError::InvalidPrice { .. })
        ));
        assert!(matches!(
            account.execute_trade(&buy("X", 1, dec!(-5)), &fees(), 1000),
            Err(LedgerError::InvalidPrice { .. })
        ));
        assert_eq!(account, before);
    }

    #[test]
    fn round_trip_costs_exactly_the_fees() {
        let mut account = Account::new("u1", money(dec!(10000)));
        let bought = account
            .execute_trade(&buy("ITC", 10, dec!(100)), &fees(), 1000)
            .unwrap();
        let sold = account
            .execute_trade(&sell("ITC", 10, dec!(100)), &fees(), 1000)
            .unwrap();

        let fees_paid = bought.trade.fees() + sold.trade.fees();
        assert_eq!(account.cash_balance, money(dec!(10000)) - fees_paid);
        assert_eq!(account.cash_balance, money(dec!(9997.28)));
        // the loss equals the charges
        assert_eq!(account.position("ITC").realized_pnl, -fees_paid);
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let mut account = Account::new("u1", money(dec!(100000)));
        for i in 0..7u64 {
            account
                .execute_trade(&buy(&format!("S{i}"), 1, dec!(10)), &fees(), 5)
                .unwrap();
        }

        assert_eq!(account.trade_history.len(), 5);
        assert_eq!(account.trade_history[0].symbol, "S6");
        assert_eq!(account.trade_history[4].symbol, "S2");
        // S0 and S1 evicted
        assert!(account.trade_history.iter().all(|t| t.symbol != "S0"));

        let recent = account.recent_trades(Some(2));
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].symbol, "S6");
    }

    #[test]
    fn summary_is_deterministic_and_uses_price_fallback() {
        let mut account = Account::new("u1", money(dec!(10000)));
        account
            .execute_trade(&buy("RELIANCE", 10, dec!(100)), &fees(), 1000)
            .unwrap();

        let first = account.summary();
        assert_eq!(first, account.summary());
        assert_eq!(first.total_invested, money(dec!(1001.25)));
        assert_eq!(first.total_current_value, money(dec!(1001.25)));
        assert_eq!(first.total_unrealized_pnl, Money::ZERO);
        assert_eq!(first.total_portfolio_value, money(dec!(10000)));

        account.apply_price("RELIANCE", dec!(110), None);
        let after = account.summary();
        assert_eq!(after.total_current_value, money(dec!(1100)));
        assert_eq!(after.total_unrealized_pnl, money(dec!(98.75)));
        assert_eq!(after.total_portfolio_value, money(dec!(10098.75)));
    }

    #[test]
    fn price_push_for_unknown_symbol_is_a_no_op() {
        let mut account = Account::new("u1", money(dec!(1000)));
        let before = account.clone();
        assert!(account.apply_price("GHOST", dec!(42), None).is_none());
        assert_eq!(account, before);
    }

    #[test]
    fn price_push_records_previous_close() {
        let mut account = Account::new("u1", money(dec!(10000)));
        account
            .execute_trade(&buy("TCS", 2, dec!(100)), &fees(), 1000)
            .unwrap();

        let position = account
            .apply_price("TCS", dec!(105), Some(dec!(102)))
            .unwrap();
        assert_eq!(position.current_price, Some(dec!(105)));
        assert_eq!(position.previous_close, Some(dec!(102)));

        // later push without a close keeps the recorded one
        let position = account.apply_price("TCS", dec!(106), None).unwrap();
        assert_eq!(position.previous_close, Some(dec!(102)));
    }

    #[test]
    fn unknown_position_reads_as_zero() {
        let account = Account::new("u1", money(dec!(1000)));
        let position = account.position("ABSENT");
        assert_eq!(position.quantity, 0);
        assert_eq!(position.total_invested, Money::ZERO);
    }
}
