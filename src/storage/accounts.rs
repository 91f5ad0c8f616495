//! Account snapshot persistence
//!
//! One directory per user under `accounts/`, holding a single
//! `ledger.json` snapshot of the account. Writes go through a temp file
//! and rename so a crash mid-write cannot leave a torn snapshot behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::ledger::Account;
use crate::storage::StoreError;

const SNAPSHOT_VERSION: u32 = 1;
const LEDGER_FILE: &str = "ledger.json";

/// On-disk wrapper around an [`Account`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub account: Account,
}

/// Port for loading and saving per-user account state.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load the latest snapshot for a user, `None` if the account was
    /// never created.
    async fn load(&self, user_id: &str) -> Result<Option<Account>, StoreError>;

    /// Persist the full account state. Must be durable before it
    /// returns; the ledger commits its in-memory mutation only after.
    async fn save(&self, account: &Account) -> Result<(), StoreError>;

    /// User ids with a stored account, unsorted.
    async fn list_users(&self) -> Result<Vec<String>, StoreError>;
}

/// JSON-file implementation of [`AccountStore`].
#[derive(Debug, Clone)]
pub struct FileAccountStore {
    accounts_dir: PathBuf,
}

impl FileAccountStore {
    pub fn new(accounts_dir: impl AsRef<Path>) -> Self {
        Self {
            accounts_dir: accounts_dir.as_ref().to_path_buf(),
        }
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.accounts_dir.join(user_id)
    }

    fn ledger_path(&self, user_id: &str) -> PathBuf {
        self.user_dir(user_id).join(LEDGER_FILE)
    }
}

#[async_trait]
impl AccountStore for FileAccountStore {
    async fn load(&self, user_id: &str) -> Result<Option<Account>, StoreError> {
        let path = self.ledger_path(user_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let snapshot: AccountSnapshot = serde_json::from_str(&content)?;
        debug!(
            user_id,
            saved_at = %snapshot.saved_at,
            "Loaded account snapshot"
        );
        Ok(Some(snapshot.account))
    }

    async fn save(&self, account: &Account) -> Result<(), StoreError> {
        let dir = self.user_dir(&account.user_id);
        fs::create_dir_all(&dir).await?;

        let snapshot = AccountSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            account: account.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        // Write-then-rename keeps the previous snapshot intact if the
        // process dies mid-write.
        let path = self.ledger_path(&account.user_id);
        let tmp = dir.join(format!("{LEDGER_FILE}.tmp"));
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;

        debug!(user_id = %account.user_id, path = %path.display(), "Saved account snapshot");
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<String>, StoreError> {
        if !self.accounts_dir.exists() {
            return Ok(Vec::new());
        }

        let mut users = Vec::new();
        let mut entries = fs::read_dir(&self.accounts_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.path().join(LEDGER_FILE).exists() {
                warn!(path = %entry.path().display(), "Skipping account directory without a ledger file");
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                users.push(name.to_string());
            }
        }
        Ok(users)
    }
}
