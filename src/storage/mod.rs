//! Persistence ports and their file-backed implementations
//!
//! Account snapshots and order documents are stored as JSON files under
//! the data directory. [`AccountStore`] is a trait so the backing store
//! can be swapped; the order store additionally keeps in-memory indexes
//! rebuilt from disk on startup.

use thiserror::Error;

pub mod accounts;
pub mod orders;

pub use accounts::{AccountSnapshot, AccountStore, FileAccountStore};
pub use orders::{FileOrderStore, OrderFilter};

/// Infrastructure failures from the backing store. Retryable by the
/// caller, with idempotency keys making order placement safe to retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding failure: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        "INFRASTRUCTURE"
    }
}
