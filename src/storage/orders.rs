//! Order document store with in-memory indexes
//!
//! One JSON document per order under `orders/`, mirrored into a DashMap
//! keyed by order id. Secondary indexes (per-user order list, unique
//! idempotency keys) are rebuilt from disk on startup. State transitions
//! persist the new document before the in-memory commit, so a failing
//! store leaves the previously committed state visible and retryable.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::orders::{Order, OrderError, OrderStatus};
use crate::storage::StoreError;

/// Listing filter for [`FileOrderStore::list`].
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub symbol: Option<String>,
    pub limit: Option<usize>,
}

/// File-backed order store. Orders are never deleted; terminal orders
/// remain as audit history.
pub struct FileOrderStore {
    orders_dir: PathBuf,
    orders: DashMap<Uuid, Order>,
    by_user: DashMap<String, Vec<Uuid>>,
    idempotency: DashMap<String, Uuid>,
}

impl FileOrderStore {
    /// Open the store, rebuilding the indexes from the order documents
    /// already on disk. Unparseable documents are skipped with a warning
    /// rather than failing startup.
    pub async fn open(orders_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self {
            orders_dir: orders_dir.as_ref().to_path_buf(),
            orders: DashMap::new(),
            by_user: DashMap::new(),
            idempotency: DashMap::new(),
        };
        fs::create_dir_all(&store.orders_dir).await?;

        let mut loaded = 0usize;
        let mut entries = fs::read_dir(&store.orders_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Order>(&content) {
                Ok(order) => {
                    store.index(&order);
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unparseable order document"),
            }
        }

        if loaded > 0 {
            info!(count = loaded, dir = %store.orders_dir.display(), "Rebuilt order indexes");
        }
        Ok(store)
    }

    fn index(&self, order: &Order) {
        self.orders.insert(order.id, order.clone());
        self.by_user
            .entry(order.user_id.clone())
            .or_default()
            .push(order.id);
        if let Some(key) = &order.idempotency_key {
            self.idempotency.insert(key.clone(), order.id);
        }
    }

    fn doc_path(&self, id: Uuid) -> PathBuf {
        self.orders_dir.join(format!("{id}.json"))
    }

    async fn write_doc(&self, order: &Order) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(order)?;
        fs::write(self.doc_path(order.id), json).await?;
        Ok(())
    }

    /// Claim an idempotency key for an order id before any mutation
    /// happens on its behalf. Fails if the key is already bound to a
    /// different order.
    pub fn reserve_idempotency(&self, key: &str, id: Uuid) -> Result<(), OrderError> {
        let entry = self.idempotency.entry(key.to_string()).or_insert(id);
        if *entry != id {
            return Err(OrderError::IdempotencyConflict {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Release a reservation whose submission failed on infrastructure,
    /// so the caller can retry with the same key.
    pub fn release_idempotency(&self, key: &str) {
        self.idempotency.remove(key);
    }

    /// Order currently bound to an idempotency key, if any.
    pub fn find_by_idempotency_key(&self, key: &str) -> Option<Order> {
        let id = *self.idempotency.get(key)?;
        self.get(id)
    }

    /// Persist and index a new order document.
    pub async fn insert(&self, order: &Order) -> Result<(), OrderError> {
        if let Some(key) = &order.idempotency_key {
            // Upholds the unique index even when the caller skipped the
            // explicit reservation step.
            self.reserve_idempotency(key, order.id)?;
        }
        if let Err(e) = self.write_doc(order).await {
            if let Some(key) = &order.idempotency_key {
                self.release_idempotency(key);
            }
            return Err(e.into());
        }
        self.index(order);
        debug!(order_id = %order.id, user_id = %order.user_id, status = %order.status, "Stored order");
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.clone())
    }

    /// Apply a state transition to a stored order: validate against the
    /// committed document, persist the result, then swap it in. The
    /// transition closure re-checks status itself, so an illegal attempt
    /// fails before anything is written. Callers serialize transitions
    /// per order ([`crate::orders::OrderGateway`] holds a per-order lock
    /// across its compositions).
    pub async fn transition<F>(&self, id: Uuid, apply: F) -> Result<Order, OrderError>
    where
        F: FnOnce(&mut Order) -> Result<(), OrderError>,
    {
        let mut working = self.get(id).ok_or(OrderError::NotFound { id })?;
        let from = working.status;
        apply(&mut working)?;
        self.write_doc(&working).await?;
        self.orders.insert(id, working.clone());
        debug!(order_id = %id, from = %from, to = %working.status, "Order transition committed");
        Ok(working)
    }

    /// Orders for a user, newest first.
    pub fn list(&self, user_id: &str, filter: &OrderFilter) -> Vec<Order> {
        let Some(ids) = self.by_user.get(user_id) else {
            return Vec::new();
        };

        let mut orders: Vec<Order> = ids
            .iter()
            .filter_map(|id| self.get(*id))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| {
                filter
                    .symbol
                    .as_ref()
                    .map_or(true, |sym| o.symbol.eq_ignore_ascii_case(sym))
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            orders.truncate(limit);
        }
        orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
