//! Order lifecycle and the gateway that executes it against the ledger

pub mod gateway;
pub mod model;

pub use gateway::{OrderGateway, Placement};
pub use model::{Order, OrderError, OrderLimits, OrderStatus, PlaceOrder};
