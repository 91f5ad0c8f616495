//! CLI command implementations
//!
//! Each command follows the same pattern: a clap `Args` struct plus a
//! command struct executing against the running engine.

pub mod ack;
pub mod buy;
pub mod cancel;
pub mod export;
pub mod fill;
pub mod init;
pub mod orders;
pub mod portfolio;
pub mod positions;
pub mod price;
pub mod sell;
pub mod trades;
pub mod version;
