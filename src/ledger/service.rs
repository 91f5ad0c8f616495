//! Ledger service actor and per-user registry
//!
//! Each account is owned by exactly one service task and mutated only
//! through its command channel, so trades against the same account are
//! applied one at a time with no interleaving. Mutations run against a
//! working copy that is persisted before being swapped in; a storage
//! failure therefore leaves the committed state untouched and publishes
//! nothing.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::events::{EventBus, LedgerEvent};
use crate::fees::FeeCalculator;
use crate::ledger::account::{Account, LedgerError, PortfolioSummary, TradeOutcome};
use crate::ledger::position::Position;
use crate::ledger::trade::{Trade, TradeRequest};
use crate::money::Money;
use crate::storage::AccountStore;

const COMMAND_BUFFER: usize = 100;

/// Ledger service commands
#[derive(Debug)]
pub enum LedgerCommand {
    ExecuteTrade {
        request: TradeRequest,
        response: oneshot::Sender<Result<TradeOutcome, LedgerError>>,
    },
    ApplyPrice {
        symbol: String,
        price: Decimal,
        previous_close: Option<Decimal>,
        response: oneshot::Sender<Result<Option<Position>, LedgerError>>,
    },
    GetPosition {
        symbol: String,
        response: oneshot::Sender<Position>,
    },
    GetPositions {
        response: oneshot::Sender<Vec<Position>>,
    },
    GetSummary {
        response: oneshot::Sender<PortfolioSummary>,
    },
    GetHistory {
        limit: Option<usize>,
        response: oneshot::Sender<Vec<Trade>>,
    },
    GetAccount {
        response: oneshot::Sender<Account>,
    },
}

/// Single-writer actor owning one account.
pub struct LedgerService {
    account: Account,
    fees: FeeCalculator,
    history_limit: usize,
    store: Arc<dyn AccountStore>,
    events: EventBus,
    command_rx: mpsc::Receiver<LedgerCommand>,
}

impl LedgerService {
    pub fn new(
        account: Account,
        fees: FeeCalculator,
        history_limit: usize,
        store: Arc<dyn AccountStore>,
        events: EventBus,
        command_rx: mpsc::Receiver<LedgerCommand>,
    ) -> Self {
        Self {
            account,
            fees,
            history_limit,
            store,
            events,
            command_rx,
        }
    }

    pub async fn run(mut self) {
        info!(user_id = %self.account.user_id, "Ledger service started");
        while let Some(command) = self.command_rx.recv().await {
            self.handle_command(command).await;
        }
        info!(user_id = %self.account.user_id, "Ledger service stopped");
    }

    async fn handle_command(&mut self, command: LedgerCommand) {
        match command {
            LedgerCommand::ExecuteTrade { request, response } => {
                let result = self.execute_trade(request).await;
                let _ = response.send(result);
            }
            LedgerCommand::ApplyPrice {
                symbol,
                price,
                previous_close,
                response,
            } => {
                let result = self.apply_price(&symbol, price, previous_close).await;
                let _ = response.send(result);
            }
            LedgerCommand::GetPosition { symbol, response } => {
                let _ = response.send(self.account.position(&symbol));
            }
            LedgerCommand::GetPositions { response } => {
                let mut positions: Vec<Position> =
                    self.account.positions.values().cloned().collect();
                positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
                let _ = response.send(positions);
            }
            LedgerCommand::GetSummary { response } => {
                let _ = response.send(self.account.summary());
            }
            LedgerCommand::GetHistory { limit, response } => {
                let _ = response.send(self.account.recent_trades(limit));
            }
            LedgerCommand::GetAccount { response } => {
                let _ = response.send(self.account.clone());
            }
        }
    }

    async fn execute_trade(&mut self, request: TradeRequest) -> Result<TradeOutcome, LedgerError> {
        let mut working = self.account.clone();
        let outcome = working.execute_trade(&request, &self.fees, self.history_limit)?;
        self.store.save(&working).await?;
        self.account = working;

        info!(
            user_id = %self.account.user_id,
            side = %outcome.trade.side,
            symbol = %outcome.trade.symbol,
            quantity = outcome.trade.quantity,
            price = %outcome.trade.price,
            total = %outcome.trade.total_cost,
            "Trade committed"
        );
        self.events.publish(LedgerEvent::TradeExecuted {
            user_id: self.account.user_id.clone(),
            trade: outcome.trade.clone(),
            position: outcome.position.clone(),
            summary: self.account.summary(),
        });
        Ok(outcome)
    }

    async fn apply_price(
        &mut self,
        symbol: &str,
        price: Decimal,
        previous_close: Option<Decimal>,
    ) -> Result<Option<Position>, LedgerError> {
        if symbol.trim().is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        if price <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice { price });
        }
        if let Some(prev) = previous_close {
            if prev <= Decimal::ZERO {
                return Err(LedgerError::InvalidPrice { price: prev });
            }
        }

        let mut working = self.account.clone();
        let Some(position) = working.apply_price(symbol, price, previous_close) else {
            debug!(user_id = %self.account.user_id, symbol, "Price for untracked symbol ignored");
            return Ok(None);
        };
        self.store.save(&working).await?;
        self.account = working;

        self.events.publish(LedgerEvent::PriceUpdated {
            user_id: self.account.user_id.clone(),
            position: position.clone(),
            summary: self.account.summary(),
        });
        Ok(Some(position))
    }
}

/// Cloneable handle for sending commands to one user's ledger service.
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    user_id: String,
    command_tx: mpsc::Sender<LedgerCommand>,
}

impl LedgerHandle {
    pub fn new(user_id: impl Into<String>, command_tx: mpsc::Sender<LedgerCommand>) -> Self {
        Self {
            user_id: user_id.into(),
            command_tx,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn execute_trade(&self, request: TradeRequest) -> Result<TradeOutcome, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LedgerCommand::ExecuteTrade {
                request,
                response: tx,
            })
            .await
            .map_err(|_| LedgerError::ServiceUnavailable)?;
        rx.await.map_err(|_| LedgerError::ServiceUnavailable)?
    }

    pub async fn apply_price(
        &self,
        symbol: impl Into<String>,
        price: Decimal,
        previous_close: Option<Decimal>,
    ) -> Result<Option<Position>, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LedgerCommand::ApplyPrice {
                symbol: symbol.into(),
                price,
                previous_close,
                response: tx,
            })
            .await
            .map_err(|_| LedgerError::ServiceUnavailable)?;
        rx.await.map_err(|_| LedgerError::ServiceUnavailable)?
    }

    pub async fn position(&self, symbol: impl Into<String>) -> Result<Position, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LedgerCommand::GetPosition {
                symbol: symbol.into(),
                response: tx,
            })
            .await
            .map_err(|_| LedgerError::ServiceUnavailable)?;
        rx.await.map_err(|_| LedgerError::ServiceUnavailable)
    }

    pub async fn positions(&self) -> Result<Vec<Position>, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LedgerCommand::GetPositions { response: tx })
            .await
            .map_err(|_| LedgerError::ServiceUnavailable)?;
        rx.await.map_err(|_| LedgerError::ServiceUnavailable)
    }

    pub async fn summary(&self) -> Result<PortfolioSummary, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LedgerCommand::GetSummary { response: tx })
            .await
            .map_err(|_| LedgerError::ServiceUnavailable)?;
        rx.await.map_err(|_| LedgerError::ServiceUnavailable)
    }

    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<Trade>, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LedgerCommand::GetHistory {
                limit,
                response: tx,
            })
            .await
            .map_err(|_| LedgerError::ServiceUnavailable)?;
        rx.await.map_err(|_| LedgerError::ServiceUnavailable)
    }

    pub async fn account(&self) -> Result<Account, LedgerError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LedgerCommand::GetAccount { response: tx })
            .await
            .map_err(|_| LedgerError::ServiceUnavailable)?;
        rx.await.map_err(|_| LedgerError::ServiceUnavailable)
    }
}

/// Spawn a ledger service for an already-loaded account.
pub fn start_ledger_service(
    account: Account,
    fees: FeeCalculator,
    history_limit: usize,
    store: Arc<dyn AccountStore>,
    events: EventBus,
) -> (LedgerHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let handle = LedgerHandle::new(account.user_id.clone(), command_tx);
    let service = LedgerService::new(account, fees, history_limit, store, events, command_rx);
    let task = tokio::spawn(service.run());
    (handle, task)
}

/// Spawns and caches one ledger service per user. Every mutation of an
/// account funnels through that single task.
pub struct LedgerRegistry {
    store: Arc<dyn AccountStore>,
    events: EventBus,
    fees: FeeCalculator,
    history_limit: usize,
    opening_cash: Money,
    handles: DashMap<String, LedgerHandle>,
    tasks: DashMap<String, JoinHandle<()>>,
}

impl LedgerRegistry {
    pub fn new(
        store: Arc<dyn AccountStore>,
        events: EventBus,
        fees: FeeCalculator,
        history_limit: usize,
        opening_cash: Money,
    ) -> Self {
        Self {
            store,
            events,
            fees,
            history_limit,
            opening_cash,
            handles: DashMap::new(),
            tasks: DashMap::new(),
        }
    }

    /// Create and persist a fresh account funded with opening cash.
    pub async fn create_account(
        &self,
        user_id: &str,
        opening_cash: Option<Money>,
    ) -> Result<Account, LedgerError> {
        validate_user_id(user_id)?;
        if self.store.load(user_id).await?.is_some() {
            return Err(LedgerError::AccountExists {
                user_id: user_id.to_string(),
            });
        }

        let account = Account::new(user_id, opening_cash.unwrap_or(self.opening_cash));
        self.store.save(&account).await?;
        info!(user_id, cash = %account.cash_balance, "Account created");
        Ok(account)
    }

    /// Handle to the user's ledger service, spawning it on first use.
    pub async fn handle(&self, user_id: &str) -> Result<LedgerHandle, LedgerError> {
        if let Some(handle) = self.handles.get(user_id) {
            return Ok(handle.clone());
        }

        let account =
            self.store
                .load(user_id)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound {
                    user_id: user_id.to_string(),
                })?;

        // Two callers may race past the load; the entry picks one winner
        // and the loser's account copy is dropped.
        match self.handles.entry(user_id.to_string()) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                let (handle, task) = start_ledger_service(
                    account,
                    self.fees.clone(),
                    self.history_limit,
                    self.store.clone(),
                    self.events.clone(),
                );
                self.tasks.insert(user_id.to_string(), task);
                slot.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    pub async fn list_users(&self) -> Result<Vec<String>, LedgerError> {
        Ok(self.store.list_users().await?)
    }

    /// Drop all handles and wait for the service tasks to drain their
    /// queues and stop.
    pub async fn shutdown(&self) {
        self.handles.clear();
        let users: Vec<String> = self.tasks.iter().map(|entry| entry.key().clone()).collect();
        let mut tasks = Vec::with_capacity(users.len());
        for user in users {
            if let Some((_, task)) = self.tasks.remove(&user) {
                tasks.push(task);
            }
        }
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                error!(error = %e, "Ledger service task panicked");
            }
        }
    }
}

fn validate_user_id(user_id: &str) -> Result<(), LedgerError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= 64
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(LedgerError::InvalidUserId {
            user_id: user_id.to_string(),
        })
    }
}
