//! Cash, positions and trade history for paper-trading accounts
//!
//! The `Account` state machine lives in [`account`]; the actor wrapper
//! that serializes access and persists commits lives in [`service`].

pub mod account;
pub mod position;
pub mod service;
pub mod trade;

pub use account::{Account, LedgerError, PortfolioSummary, TradeOutcome};
pub use position::Position;
pub use service::{
    start_ledger_service, LedgerCommand, LedgerHandle, LedgerRegistry, LedgerService,
};
pub use trade::{OrderKind, OrderSide, Trade, TradeRequest, TradeStatus};
