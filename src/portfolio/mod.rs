//! Portfolio aggregation and terminal presentation
//!
//! Derives position and account level metrics from ledger snapshots and
//! renders them for the CLI. Pure derivation; the ledger stays the only
//! writer.

pub mod aggregator;
pub mod display;

pub use aggregator::{
    build_report, position_metrics, PortfolioReport, PortfolioTotals, PositionMetrics,
    RiskLevel, RiskMetrics,
};
