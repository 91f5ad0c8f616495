//! Order gateway composing the lifecycle with ledger execution
//!
//! The gateway owns the coupling between an order document and the
//! ledger trade it produces. Compositions that touch both (fill, market
//! place) run under a per-order lock, so a fill and a cancel of the
//! same order cannot interleave between the status check and the
//! commit. Funds only ever move through the ledger actor; the order
//! document records what happened.

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::ledger::{LedgerRegistry, OrderKind, TradeOutcome, TradeRequest};
use crate::orders::model::{Order, OrderError, OrderLimits, PlaceOrder};
use crate::storage::{FileOrderStore, OrderFilter};

/// Result of submitting an order: the stored order, plus the trade
/// outcome when the submission executed immediately.
#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    pub order: Order,
    pub outcome: Option<TradeOutcome>,
}

pub struct OrderGateway {
    store: Arc<FileOrderStore>,
    ledgers: Arc<LedgerRegistry>,
    limits: OrderLimits,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl OrderGateway {
    pub fn new(store: Arc<FileOrderStore>, ledgers: Arc<LedgerRegistry>, limits: OrderLimits) -> Self {
        Self {
            store,
            ledgers,
            limits,
            locks: DashMap::new(),
        }
    }

    fn order_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn drop_lock(&self, id: Uuid) {
        // Terminal orders fail every later transition on the status
        // check alone, so their lock entry can go.
        self.locks.remove(&id);
    }

    /// Submit an order. Market orders execute against the ledger
    /// immediately; a ledger rejection still persists the order in
    /// `Rejected` as part of the audit trail, and the typed error is
    /// returned to the caller. Limit orders are stored `Pending`.
    ///
    /// Resubmitting with an already-bound idempotency key fails with
    /// `IdempotencyConflict` before anything executes; the recorded
    /// order stays the only document for that key and can be recovered
    /// with [`OrderGateway::find_by_idempotency_key`].
    pub async fn place(&self, request: PlaceOrder) -> Result<Placement, OrderError> {
        let mut order = Order::create_with_limits(request, &self.limits)?;
        let ledger = self.ledgers.handle(&order.user_id).await?;

        if let Some(key) = &order.idempotency_key {
            self.store.reserve_idempotency(key, order.id)?;
            debug!(key, order_id = %order.id, "Idempotency key reserved");
        }

        match order.kind {
            OrderKind::Market => {
                let result = ledger
                    .execute_trade(TradeRequest {
                        symbol: order.symbol.clone(),
                        quantity: order.quantity,
                        price: order.price,
                        side: order.side,
                        kind: order.kind,
                        order_id: Some(order.id),
                    })
                    .await;

                match result {
                    Ok(outcome) => {
                        order.fill(order.price, outcome.trade.fees())?;
                        self.store.insert(&order).await?;
                        info!(
                            order_id = %order.id,
                            user_id = %order.user_id,
                            side = %order.side,
                            symbol = %order.symbol,
                            "Market order filled"
                        );
                        Ok(Placement {
                            order,
                            outcome: Some(outcome),
                        })
                    }
                    Err(e) if e.is_retryable() => {
                        if let Some(key) = &order.idempotency_key {
                            self.store.release_idempotency(key);
                        }
                        Err(e.into())
                    }
                    Err(e) => {
                        order.reject(e.to_string())?;
                        self.store.insert(&order).await?;
                        info!(
                            order_id = %order.id,
                            user_id = %order.user_id,
                            reason = %e,
                            "Market order rejected by ledger"
                        );
                        Err(e.into())
                    }
                }
            }
            OrderKind::Limit => {
                self.store.insert(&order).await?;
                info!(
                    order_id = %order.id,
                    user_id = %order.user_id,
                    side = %order.side,
                    symbol = %order.symbol,
                    limit = %order.limit_price.unwrap_or(Decimal::ZERO),
                    "Limit order placed"
                );
                Ok(Placement {
                    order,
                    outcome: None,
                })
            }
        }
    }

    /// Fill a resting order at `execution_price`: validate against the
    /// committed order, execute the ledger trade, then mark the order
    /// filled with the trade's actual charges.
    pub async fn fill(
        &self,
        order_id: Uuid,
        execution_price: Decimal,
    ) -> Result<(Order, TradeOutcome), OrderError> {
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().await;

        let order = self
            .store
            .get(order_id)
            .ok_or(OrderError::NotFound { id: order_id })?;
        order.ensure_fillable(execution_price)?;

        let ledger = self.ledgers.handle(&order.user_id).await?;
        let outcome = ledger
            .execute_trade(TradeRequest {
                symbol: order.symbol.clone(),
                quantity: order.quantity,
                price: execution_price,
                side: order.side,
                kind: order.kind,
                order_id: Some(order.id),
            })
            .await?;

        let trade_fees = outcome.trade.fees();
        match self
            .store
            .transition(order_id, |o| o.fill(execution_price, trade_fees))
            .await
        {
            Ok(filled) => {
                self.drop_lock(order_id);
                info!(
                    order_id = %order_id,
                    trade_id = %outcome.trade.id,
                    price = %execution_price,
                    "Order filled"
                );
                Ok((filled, outcome))
            }
            Err(e) => {
                // The trade is committed; the order document will catch
                // up on the next successful write against it.
                error!(
                    order_id = %order_id,
                    trade_id = %outcome.trade.id,
                    error = %e,
                    "Trade committed but order document update failed"
                );
                Err(e)
            }
        }
    }

    /// Cancel a pending or open order. The reason is logged, not stored.
    pub async fn cancel(&self, order_id: Uuid, reason: Option<&str>) -> Result<Order, OrderError> {
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().await;

        let cancelled = self.store.transition(order_id, |o| o.cancel()).await?;
        self.drop_lock(order_id);
        info!(
            order_id = %order_id,
            reason = reason.unwrap_or("not given"),
            "Order cancelled"
        );
        Ok(cancelled)
    }

    /// Reject a pending or open order, recording the reason on it.
    pub async fn reject(&self, order_id: Uuid, reason: &str) -> Result<Order, OrderError> {
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().await;

        let rejected = self.store.transition(order_id, |o| o.reject(reason)).await?;
        self.drop_lock(order_id);
        info!(order_id = %order_id, reason, "Order rejected");
        Ok(rejected)
    }

    /// Acknowledge a pending limit order as resting (`Open`).
    pub async fn acknowledge(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().await;

        let open = self.store.transition(order_id, |o| o.acknowledge()).await?;
        info!(order_id = %order_id, "Order acknowledged");
        Ok(open)
    }

    pub fn get(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.store
            .get(order_id)
            .ok_or(OrderError::NotFound { id: order_id })
    }

    /// The order recorded under an idempotency key, if any.
    pub fn find_by_idempotency_key(&self, key: &str) -> Option<Order> {
        self.store.find_by_idempotency_key(key)
    }

    /// A user's orders, newest first.
    pub fn orders(&self, user_id: &str, filter: &OrderFilter) -> Vec<Order> {
        self.store.list(user_id, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::fees::FeeCalculator;
    use crate::ledger::{LedgerError, OrderSide};
    use crate::money::Money;
    use crate::orders::model::OrderStatus;
    use crate::storage::FileAccountStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        _dir: tempfile::TempDir,
        ledgers: Arc<LedgerRegistry>,
        gateway: OrderGateway,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let account_store = Arc::new(FileAccountStore::new(dir.path().join("accounts")));
        let order_store = Arc::new(
            FileOrderStore::open(dir.path().join("orders"))
                .await
                .unwrap(),
        );
        let ledgers = Arc::new(LedgerRegistry::new(
            account_store,
            EventBus::new(64),
            FeeCalculator::default(),
            1000,
            Money::from_decimal(dec!(10000)),
        ));
        ledgers.create_account("alice", None).await.unwrap();
        let gateway = OrderGateway::new(order_store.clone(), ledgers.clone(), OrderLimits::default());
        Fixture {
            _dir: dir,
            ledgers,
            gateway,
        }
    }

    fn market_buy(quantity: u64, price: Decimal) -> PlaceOrder {
        PlaceOrder {
            user_id: "alice".to_string(),
            side: OrderSide::Buy,
            symbol: "TCS".to_string(),
            stock_name: None,
            quantity,
            price,
            kind: OrderKind::Market,
            limit_price: None,
            idempotency_key: None,
        }
    }

    fn limit_buy(quantity: u64, price: Decimal, limit: Decimal) -> PlaceOrder {
        PlaceOrder {
            kind: OrderKind::Limit,
            limit_price: Some(limit),
            ..market_buy(quantity, price)
        }
    }

    #[tokio::test]
    async fn market_order_fills_and_moves_funds() {
        let fx = fixture().await;
        let placement = fx.gateway.place(market_buy(10, dec!(100))).await.unwrap();

        let order = &placement.order;
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.execution_price, Some(dec!(100)));
        let outcome = placement.outcome.as_ref().unwrap();
        assert_eq!(outcome.trade.order_id, Some(order.id));
        assert_eq!(order.total, Some(outcome.trade.total_cost));
        assert_eq!(order.fees, Some(outcome.trade.fees()));

        let account = fx
            .ledgers
            .handle("alice")
            .await
            .unwrap()
            .account()
            .await
            .unwrap();
        assert_eq!(account.position("TCS").quantity, 10);
        assert_eq!(account.cash_balance, outcome.cash_balance);
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn rejected_market_order_is_persisted_with_the_reason() {
        let fx = fixture().await;
        let err = fx
            .gateway
            .place(market_buy(10, dec!(5000)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");
        assert!(!err.is_retryable());

        let orders = fx.gateway.orders("alice", &OrderFilter::default());
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Rejected);
        assert!(orders[0]
            .rejection_reason
            .as_deref()
            .unwrap()
            .contains("insufficient balance"));

        // ledger untouched
        let account = fx
            .ledgers
            .handle("alice")
            .await
            .unwrap()
            .account()
            .await
            .unwrap();
        assert_eq!(account.cash_balance, Money::from_decimal(dec!(10000)));
        assert!(account.trade_history.is_empty());
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn limit_order_rests_until_filled_within_bound() {
        let fx = fixture().await;
        let placement = fx
            .gateway
            .place(limit_buy(10, dec!(100), dec!(95)))
            .await
            .unwrap();
        let order_id = placement.order.id;
        assert_eq!(placement.order.status, OrderStatus::Pending);
        assert!(placement.outcome.is_none());

        // above the buy limit
        let err = fx.gateway.fill(order_id, dec!(96)).await.unwrap_err();
        assert_eq!(err.code(), "PRICE_ABOVE_LIMIT");
        assert_eq!(fx.gateway.get(order_id).unwrap().status, OrderStatus::Pending);

        let (filled, outcome) = fx.gateway.fill(order_id, dec!(94)).await.unwrap();
        assert_eq!(filled.status, OrderStatus::Filled);
        assert_eq!(outcome.trade.price, dec!(94));
        assert_eq!(filled.total, Some(outcome.trade.total_cost));
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn cancelled_order_cannot_fill_and_ledger_stays_untouched() {
        let fx = fixture().await;
        let placement = fx
            .gateway
            .place(limit_buy(10, dec!(100), dec!(95)))
            .await
            .unwrap();
        let order_id = placement.order.id;

        let cancelled = fx.gateway.cancel(order_id, Some("changed my mind")).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        let err = fx.gateway.fill(order_id, dec!(94)).await.unwrap_err();
        assert_eq!(err.code(), "ORDER_NOT_FILLABLE");

        let account = fx
            .ledgers
            .handle("alice")
            .await
            .unwrap()
            .account()
            .await
            .unwrap();
        assert_eq!(account.cash_balance, Money::from_decimal(dec!(10000)));
        assert_eq!(account.position("TCS").quantity, 0);

        let err = fx.gateway.cancel(order_id, None).await.unwrap_err();
        assert_eq!(err.code(), "ORDER_NOT_CANCELLABLE");
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn acknowledge_marks_the_order_resting() {
        let fx = fixture().await;
        let placement = fx
            .gateway
            .place(limit_buy(5, dec!(100), dec!(95)))
            .await
            .unwrap();
        let order_id = placement.order.id;

        let open = fx.gateway.acknowledge(order_id).await.unwrap();
        assert_eq!(open.status, OrderStatus::Open);

        let err = fx.gateway.acknowledge(order_id).await.unwrap_err();
        assert_eq!(err.code(), "ORDER_NOT_OPENABLE");

        // open orders still fill
        let (filled, _) = fx.gateway.fill(order_id, dec!(95)).await.unwrap();
        assert_eq!(filled.status, OrderStatus::Filled);
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn reject_records_the_reason() {
        let fx = fixture().await;
        let placement = fx
            .gateway
            .place(limit_buy(5, dec!(100), dec!(95)))
            .await
            .unwrap();

        let rejected = fx
            .gateway
            .reject(placement.order.id, "symbol suspended")
            .await
            .unwrap();
        assert_eq!(rejected.status, OrderStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("symbol suspended"));
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_rejected_without_a_second_trade() {
        let fx = fixture().await;
        let mut request = market_buy(10, dec!(100));
        request.idempotency_key = Some("req-42".to_string());

        let first = fx.gateway.place(request.clone()).await.unwrap();
        let err = fx.gateway.place(request).await.unwrap_err();
        assert_eq!(err.code(), "IDEMPOTENCY_CONFLICT");

        // the recorded order stays the only document for the key
        let recorded = fx.gateway.find_by_idempotency_key("req-42").unwrap();
        assert_eq!(recorded.id, first.order.id);
        assert_eq!(fx.gateway.orders("alice", &OrderFilter::default()).len(), 1);

        // exactly one trade happened
        let account = fx
            .ledgers
            .handle("alice")
            .await
            .unwrap()
            .account()
            .await
            .unwrap();
        assert_eq!(account.trade_history.len(), 1);
        assert_eq!(account.position("TCS").quantity, 10);
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn rejected_submission_keeps_its_idempotency_key() {
        let fx = fixture().await;
        let mut request = market_buy(10, dec!(5000));
        request.idempotency_key = Some("req-broke".to_string());

        let err = fx.gateway.place(request.clone()).await.unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");

        // the rejection is the recorded outcome for this key
        let err = fx.gateway.place(request).await.unwrap_err();
        assert_eq!(err.code(), "IDEMPOTENCY_CONFLICT");
        let recorded = fx.gateway.find_by_idempotency_key("req-broke").unwrap();
        assert_eq!(recorded.status, OrderStatus::Rejected);
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_order_and_user_are_typed_errors() {
        let fx = fixture().await;
        let err = fx.gateway.fill(Uuid::new_v4(), dec!(100)).await.unwrap_err();
        assert_eq!(err.code(), "ORDER_NOT_FOUND");

        let mut request = market_buy(1, dec!(100));
        request.user_id = "ghost".to_string();
        let err = fx.gateway.place(request).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::Ledger(LedgerError::AccountNotFound { .. })
        ));
        fx.ledgers.shutdown().await;
    }

    #[tokio::test]
    async fn sell_fill_realizes_pnl_on_the_trade() {
        let fx = fixture().await;
        fx.gateway.place(market_buy(10, dec!(100))).await.unwrap();

        let sell = PlaceOrder {
            side: OrderSide::Sell,
            kind: OrderKind::Limit,
            limit_price: Some(dec!(110)),
            ..market_buy(4, dec!(100))
        };
        let placement = fx.gateway.place(sell).await.unwrap();
        let (filled, outcome) = fx.gateway.fill(placement.order.id, dec!(120)).await.unwrap();

        assert!(outcome.trade.realized_pnl > Money::ZERO);
        assert_eq!(filled.total, Some(outcome.trade.total_cost));
        assert_eq!(outcome.position.quantity, 6);
        fx.ledgers.shutdown().await;
    }
}
