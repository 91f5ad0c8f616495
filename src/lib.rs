pub mod cli;
pub mod config;
pub mod data_paths;
pub mod engine;
pub mod events;
pub mod fees;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod orders;
pub mod portfolio;
pub mod storage;

// Re-export the composition root at the crate level
pub use engine::Engine;
