//! Engine wiring
//!
//! Builds the storage, event and service graph in dependency order and
//! hands out the composed handles. One `Engine` per process: the CLI
//! starts it, runs a command against it and shuts it down.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::data_paths::DataPaths;
use crate::events::{start_notification_dispatcher, EventBus, TracingNotificationSink};
use crate::fees::FeeCalculator;
use crate::ledger::LedgerRegistry;
use crate::money::Money;
use crate::orders::OrderGateway;
use crate::storage::{FileAccountStore, FileOrderStore};

pub struct Engine {
    config: EngineConfig,
    data_paths: DataPaths,
    events: EventBus,
    ledgers: Arc<LedgerRegistry>,
    orders: Arc<OrderGateway>,
    dispatcher: JoinHandle<()>,
}

impl Engine {
    /// Bring up stores, the event bus, the ledger registry and the
    /// order gateway against the given data directory.
    pub async fn start(config: EngineConfig, data_paths: DataPaths) -> Result<Self> {
        data_paths.ensure_directories().with_context(|| {
            format!(
                "Failed to create data directories under {}",
                data_paths.root().display()
            )
        })?;

        let account_store = Arc::new(FileAccountStore::new(data_paths.accounts()));
        let order_store = Arc::new(
            FileOrderStore::open(data_paths.orders())
                .await
                .context("Failed to open order store")?,
        );

        let events = EventBus::new(config.event_capacity);
        let ledgers = Arc::new(LedgerRegistry::new(
            account_store,
            events.clone(),
            FeeCalculator::new(config.fees.clone()),
            config.trade_history_limit,
            Money::from_decimal(config.opening_cash),
        ));
        let orders = Arc::new(OrderGateway::new(
            order_store,
            ledgers.clone(),
            config.order_limits(),
        ));
        let dispatcher = start_notification_dispatcher(&events, Arc::new(TracingNotificationSink));

        info!(data_dir = %data_paths.root().display(), "Engine started");
        Ok(Self {
            config,
            data_paths,
            events,
            ledgers,
            orders,
            dispatcher,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn data_paths(&self) -> &DataPaths {
        &self.data_paths
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn ledgers(&self) -> &Arc<LedgerRegistry> {
        &self.ledgers
    }

    pub fn orders(&self) -> &Arc<OrderGateway> {
        &self.orders
    }

    /// Drain the ledger actors, release the event bus and wait for the
    /// notification dispatcher to stop.
    pub async fn shutdown(self) {
        let Self {
            ledgers,
            orders,
            events,
            dispatcher,
            ..
        } = self;

        ledgers.shutdown().await;
        drop(orders);
        drop(ledgers);
        // Last sender gone: the dispatcher's stream ends on its own.
        drop(events);
        if let Err(e) = dispatcher.await {
            error!(error = %e, "Notification dispatcher panicked");
        }
        info!("Engine stopped");
    }
}
