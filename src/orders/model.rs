//! Order lifecycle state machine
//!
//! Orders start `Pending`, may be acknowledged to `Open`, and end in
//! exactly one of `Filled`, `Cancelled` or `Rejected`. Terminal orders
//! are frozen: every transition validates the current status first and
//! returns a typed error instead of mutating. Limit fills additionally
//! check the execution price against the order's bound.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::{LedgerError, OrderKind, OrderSide};
use crate::money::Money;
use crate::storage::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Open,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Terminal orders accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Rejected)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Open => "OPEN",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {id} not found")]
    NotFound { id: Uuid },
    #[error("order in status {status} cannot be filled")]
    NotFillable { status: OrderStatus },
    #[error("order in status {status} cannot be cancelled")]
    NotCancellable { status: OrderStatus },
    #[error("order in status {status} cannot be rejected")]
    NotRejectable { status: OrderStatus },
    #[error("order in status {status} cannot be acknowledged")]
    NotOpenable { status: OrderStatus },
    #[error("execution price {price} is above the buy limit {limit}")]
    PriceAboveLimit { price: Decimal, limit: Decimal },
    #[error("execution price {price} is below the sell limit {limit}")]
    PriceBelowLimit { price: Decimal, limit: Decimal },
    #[error("limit orders require a limit price")]
    MissingLimitPrice,
    #[error("market orders do not take a limit price")]
    UnexpectedLimitPrice,
    #[error("quantity {quantity} is outside the allowed range {min}..={max}")]
    InvalidQuantity { quantity: u64, min: u64, max: u64 },
    #[error("idempotency key {key:?} was already used by a different order")]
    IdempotencyConflict { key: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::NotFound { .. } => "ORDER_NOT_FOUND",
            OrderError::NotFillable { .. } => "ORDER_NOT_FILLABLE",
            OrderError::NotCancellable { .. } => "ORDER_NOT_CANCELLABLE",
            OrderError::NotRejectable { .. } => "ORDER_NOT_REJECTABLE",
            OrderError::NotOpenable { .. } => "ORDER_NOT_OPENABLE",
            OrderError::PriceAboveLimit { .. } => "PRICE_ABOVE_LIMIT",
            OrderError::PriceBelowLimit { .. } => "PRICE_BELOW_LIMIT",
            OrderError::MissingLimitPrice => "LIMIT_PRICE_REQUIRED",
            OrderError::UnexpectedLimitPrice => "LIMIT_PRICE_NOT_ALLOWED",
            OrderError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            OrderError::IdempotencyConflict { .. } => "IDEMPOTENCY_CONFLICT",
            OrderError::Ledger(e) => e.code(),
            OrderError::Store(_) => "INFRASTRUCTURE",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            OrderError::Ledger(e) => e.is_retryable(),
            OrderError::Store(_) => true,
            _ => false,
        }
    }
}

/// Quantity bounds enforced at submission.
#[derive(Debug, Clone, Copy)]
pub struct OrderLimits {
    pub min_quantity: u64,
    pub max_quantity: u64,
}

impl Default for OrderLimits {
    fn default() -> Self {
        Self {
            min_quantity: 1,
            max_quantity: 10_000,
        }
    }
}

/// Order submission, validated by [`Order::create`].
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_id: String,
    pub side: OrderSide,
    pub symbol: String,
    pub stock_name: Option<String>,
    pub quantity: u64,
    /// Reference price at submission. Market orders execute at it.
    pub price: Decimal,
    pub kind: OrderKind,
    pub limit_price: Option<Decimal>,
    pub idempotency_key: Option<String>,
}

/// One order through its whole lifecycle. Execution details stay `None`
/// until the order fills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub side: OrderSide,
    pub symbol: String,
    pub stock_name: Option<String>,
    pub quantity: u64,
    pub price: Decimal,
    pub kind: OrderKind,
    pub limit_price: Option<Decimal>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub execution_price: Option<Decimal>,
    pub fees: Option<Money>,
    /// Estimated at placement as quantity times the limit-or-reference
    /// price; replaced on fill by the fee-inclusive amount (gross debit
    /// for buys, net proceeds for sells).
    pub total: Option<Money>,
    pub idempotency_key: Option<String>,
}

impl Order {
    /// Validate a submission with default limits and mint its `Pending`
    /// order. Symbols are normalized to uppercase.
    pub fn create(request: PlaceOrder) -> Result<Self, OrderError> {
        Self::create_with_limits(request, &OrderLimits::default())
    }

    pub fn create_with_limits(
        request: PlaceOrder,
        limits: &OrderLimits,
    ) -> Result<Self, OrderError> {
        let symbol = request.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(LedgerError::EmptySymbol.into());
        }
        if request.quantity < limits.min_quantity || request.quantity > limits.max_quantity {
            return Err(OrderError::InvalidQuantity {
                quantity: request.quantity,
                min: limits.min_quantity,
                max: limits.max_quantity,
            });
        }
        if request.price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                price: request.price,
            }
            .into());
        }
        match (request.kind, request.limit_price) {
            (OrderKind::Limit, None) => return Err(OrderError::MissingLimitPrice),
            (OrderKind::Market, Some(_)) => return Err(OrderError::UnexpectedLimitPrice),
            (OrderKind::Limit, Some(limit)) if limit <= Decimal::ZERO => {
                return Err(LedgerError::InvalidPrice { price: limit }.into());
            }
            _ => {}
        }

        let reference = request.limit_price.unwrap_or(request.price);
        let estimate = Money::from_decimal(reference * Decimal::from(request.quantity));

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            side: request.side,
            symbol,
            stock_name: request.stock_name,
            quantity: request.quantity,
            price: request.price,
            kind: request.kind,
            limit_price: request.limit_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            filled_at: None,
            cancelled_at: None,
            rejected_at: None,
            rejection_reason: None,
            execution_price: None,
            fees: None,
            total: Some(estimate),
            idempotency_key: request.idempotency_key,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Human label: the stock name when one was supplied, else the symbol.
    pub fn display_name(&self) -> &str {
        self.stock_name.as_deref().unwrap_or(&self.symbol)
    }

    /// `Pending` -> `Open`, for limit orders registered with a price
    /// trigger.
    pub fn acknowledge(&mut self) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending {
            return Err(OrderError::NotOpenable {
                status: self.status,
            });
        }
        self.status = OrderStatus::Open;
        Ok(())
    }

    /// Status and limit-bound checks for a fill, without mutating.
    pub fn ensure_fillable(&self, execution_price: Decimal) -> Result<(), OrderError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Open) {
            return Err(OrderError::NotFillable {
                status: self.status,
            });
        }
        if execution_price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice {
                price: execution_price,
            }
            .into());
        }
        if self.kind == OrderKind::Limit {
            if let Some(limit) = self.limit_price {
                match self.side {
                    OrderSide::Buy if execution_price > limit => {
                        return Err(OrderError::PriceAboveLimit {
                            price: execution_price,
                            limit,
                        });
                    }
                    OrderSide::Sell if execution_price < limit => {
                        return Err(OrderError::PriceBelowLimit {
                            price: execution_price,
                            limit,
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Fill at `execution_price`, recording fees and the side-aware
    /// total (debit for buys, net credit for sells).
    pub fn fill(&mut self, execution_price: Decimal, fees: Money) -> Result<(), OrderError> {
        self.ensure_fillable(execution_price)?;
        let value = Money::from_decimal(execution_price * Decimal::from(self.quantity));
        self.status = OrderStatus::Filled;
        self.filled_at = Some(Utc::now());
        self.execution_price = Some(execution_price);
        self.fees = Some(fees);
        self.total = Some(match self.side {
            OrderSide::Buy => value + fees,
            OrderSide::Sell => value - fees,
        });
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Open) {
            return Err(OrderError::NotCancellable {
                status: self.status,
            });
        }
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        Ok(())
    }

    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Open) {
            return Err(OrderError::NotRejectable {
                status: self.status,
            });
        }
        self.status = OrderStatus::Rejected;
        self.rejected_at = Some(Utc::now());
        self.rejection_reason = Some(reason.into());
        Ok(())
    }
}
