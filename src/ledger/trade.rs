//! Immutable trade records and the request that produces them

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::money::Money;

/// Side of an order and of the trade it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Execution style: immediate at the quoted price, or deferred behind
/// a user-supplied price bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    Market,
    Limit,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Market => write!(f, "MARKET"),
            OrderKind::Limit => write!(f, "LIMIT"),
        }
    }
}

/// Trades exist only once executed; the status is retained for the
/// audit record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Executed,
}

/// An executed trade. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub symbol: String,
    pub quantity: u64,
    /// Per-share execution price, full precision.
    pub price: Decimal,
    pub side: OrderSide,
    pub kind: OrderKind,
    /// quantity * price, as a money amount.
    pub trade_value: Money,
    pub brokerage: Money,
    pub taxes: Money,
    /// BUY: gross debit including charges. SELL: net proceeds credited.
    pub total_cost: Money,
    /// Profit locked in by this trade; zero for buys.
    pub realized_pnl: Money,
    pub executed_at: DateTime<Utc>,
    pub status: TradeStatus,
    /// Order that produced this trade, when one exists.
    pub order_id: Option<Uuid>,
}

impl Trade {
    /// Charges debited on top of (BUY) or out of (SELL) the trade value.
    pub fn fees(&self) -> Money {
        self.brokerage + self.taxes
    }
}

/// Input to [`Account::execute_trade`](crate::ledger::Account::execute_trade).
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: u64,
    pub price: Decimal,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub order_id: Option<Uuid>,
}
