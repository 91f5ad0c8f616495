//! In-process event channel for committed ledger changes
//!
//! Domain events are published after a mutation has been persisted and
//! committed, never before. Delivery is fire-and-forget over a tokio
//! broadcast channel: a slow subscriber drops old events instead of
//! back-pressuring the ledger.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::ledger::{PortfolioSummary, Position, Trade};

/// Committed ledger change, with enough payload that subscribers never
/// have to query the ledger back.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEvent {
    TradeExecuted {
        user_id: String,
        trade: Trade,
        position: Position,
        summary: PortfolioSummary,
    },
    PriceUpdated {
        user_id: String,
        position: Position,
        summary: PortfolioSummary,
    },
}

impl LedgerEvent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::TradeExecuted { user_id, .. } => user_id,
            Self::PriceUpdated { user_id, .. } => user_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TradeExecuted { .. } => "TRADE_EXECUTED",
            Self::PriceUpdated { .. } => "PRICE_UPDATED",
        }
    }
}

/// Cloneable publish/subscribe handle over a broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is normal (one-shot CLI
    /// runs without a dispatcher) and is not an error.
    pub fn publish(&self, event: LedgerEvent) {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(receivers) => debug!(kind, receivers, "Published ledger event"),
            Err(_) => debug!(kind, "No subscribers for ledger event"),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// User-facing rendering of a ledger event.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

impl Notification {
    pub fn from_event(event: &LedgerEvent) -> Self {
        let data = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        match event {
            LedgerEvent::TradeExecuted { trade, .. } => Self {
                kind: event.kind().to_string(),
                title: "Trade executed".to_string(),
                message: format!(
                    "{} {} {} @ {:.2}",
                    trade.side, trade.quantity, trade.symbol, trade.price
                ),
                data,
            },
            LedgerEvent::PriceUpdated { position, .. } => Self {
                kind: event.kind().to_string(),
                title: "Price updated".to_string(),
                message: format!(
                    "{} marked at {:.2}",
                    position.symbol,
                    position.current_price.unwrap_or(position.avg_price)
                ),
                data,
            },
        }
    }
}

/// Delivery endpoint for notifications. Implementations must tolerate
/// redelivery gaps; the dispatcher drops events on lag.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Sink that writes notifications to the log. The default for CLI runs.
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            kind = %notification.kind,
            title = %notification.title,
            "{}",
            notification.message
        );
        Ok(())
    }
}

/// Spawn the dispatcher task bridging the event bus to a sink. Sink
/// failures are logged and never reach the publisher. The task ends when
/// the bus is dropped.
pub fn start_notification_dispatcher(
    bus: &EventBus,
    sink: Arc<dyn NotificationSink>,
) -> JoinHandle<()> {
    let mut stream = BroadcastStream::new(bus.subscribe());
    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    let notification = Notification::from_event(&event);
                    if let Err(e) = sink.deliver(&notification).await {
                        warn!(kind = %notification.kind, error = %e, "Notification delivery failed");
                    }
                }
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification stream lagged, dropping events");
                }
            }
        }
        debug!("Notification dispatcher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{OrderKind, OrderSide, TradeStatus};
    use crate::money::Money;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    fn sample_event() -> LedgerEvent {
        let trade = Trade {
            id: Uuid::new_v4(),
            symbol: "RELIANCE".to_string(),
            quantity: 10,
            price: dec!(100),
            side: OrderSide::Buy,
            kind: OrderKind::Market,
            trade_value: Money::from_decimal(dec!(1000)),
            brokerage: Money::from_decimal(dec!(1)),
            taxes: Money::from_decimal(dec!(0.25)),
            total_cost: Money::from_decimal(dec!(1001.25)),
            realized_pnl: Money::ZERO,
            executed_at: Utc::now(),
            status: TradeStatus::Executed,
            order_id: None,
        };
        let position = Position::new("RELIANCE");
        LedgerEvent::TradeExecuted {
            user_id: "alice".to_string(),
            trade,
            position,
            summary: PortfolioSummary::default(),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(sample_event());
        assert_eq!(bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(sample_event());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id(), "alice");
        assert_eq!(event.kind(), "TRADE_EXECUTED");
    }

    #[tokio::test]
    async fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["type"], "TRADE_EXECUTED");
        assert_eq!(json["user_id"], "alice");
        assert_eq!(json["trade"]["symbol"], "RELIANCE");
    }

    struct RecordingSink {
        delivered: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
            self.delivered.lock().await.push(notification.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatcher_delivers_notifications_to_sink() {
        let bus = EventBus::new(16);
        let sink = Arc::new(RecordingSink {
            delivered: Mutex::new(Vec::new()),
        });
        let handle = start_notification_dispatcher(&bus, sink.clone());

        bus.publish(sample_event());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let delivered = sink.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].kind, "TRADE_EXECUTED");
        assert!(delivered[0].message.contains("RELIANCE"));
        drop(delivered);

        drop(bus);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn dispatcher_survives_failing_sink() {
        struct FailingSink;

        #[async_trait]
        impl NotificationSink for FailingSink {
            async fn deliver(&self, _notification: &Notification) -> anyhow::Result<()> {
                anyhow::bail!("sink offline")
            }
        }

        let bus = EventBus::new(16);
        let handle = start_notification_dispatcher(&bus, Arc::new(FailingSink));

        bus.publish(sample_event());
        bus.publish(sample_event());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // dispatcher is still alive, shutdown is clean
        drop(bus);
        handle.await.unwrap();
    }
}
