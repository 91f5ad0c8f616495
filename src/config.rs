//! Engine configuration
//!
//! Compile-time defaults, optionally overridden by a YAML file and then
//! by environment variables. Fee rates ride along as a [`FeeSchedule`]
//! section with its own per-field defaults.

use anyhow::{ensure, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::fees::FeeSchedule;
use crate::orders::OrderLimits;

pub const ENV_OPENING_CASH: &str = "PAPERBROKER_OPENING_CASH";
pub const ENV_HISTORY_LIMIT: &str = "PAPERBROKER_HISTORY_LIMIT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cash a freshly created account starts with.
    pub opening_cash: Decimal,
    /// Trades retained per account, newest first.
    pub trade_history_limit: usize,
    pub min_order_quantity: u64,
    pub max_order_quantity: u64,
    /// Broadcast channel capacity for ledger events.
    pub event_capacity: usize,
    pub fees: FeeSchedule,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            opening_cash: Decimal::from(10_000),
            trade_history_limit: 1000,
            min_order_quantity: 1,
            max_order_quantity: 10_000,
            event_capacity: 256,
            fees: FeeSchedule::default(),
        }
    }
}

impl EngineConfig {
    /// Load the config file when present, then apply environment
    /// overrides. A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let config: EngineConfig = serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse config YAML: {}", path.display()))?;
                debug!(path = %path.display(), "Loaded engine config");
                config
            }
            _ => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(ENV_OPENING_CASH) {
            match raw.parse() {
                Ok(cash) => self.opening_cash = cash,
                Err(_) => warn!(value = %raw, "Ignoring unparseable {ENV_OPENING_CASH}"),
            }
        }
        if let Ok(raw) = std::env::var(ENV_HISTORY_LIMIT) {
            match raw.parse() {
                Ok(limit) => self.trade_history_limit = limit,
                Err(_) => warn!(value = %raw, "Ignoring unparseable {ENV_HISTORY_LIMIT}"),
            }
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.opening_cash >= Decimal::ZERO,
            "opening cash must not be negative"
        );
        ensure!(
            self.trade_history_limit >= 1,
            "trade history limit must be at least 1"
        );
        ensure!(
            self.min_order_quantity >= 1,
            "minimum order quantity must be at least 1"
        );
        ensure!(
            self.min_order_quantity <= self.max_order_quantity,
            "order quantity bounds are inverted"
        );
        Ok(())
    }

    pub fn order_limits(&self) -> OrderLimits {
        OrderLimits {
            min_quantity: self.min_order_quantity,
            max_quantity: self.max_order_quantity,
        }
    }
}
