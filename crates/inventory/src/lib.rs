//! Event-sourced inventory.
//!
//! A product's stock position is never stored directly: it is rebuilt on
//! demand by folding the product's event stream ([`StockLevel`]), and
//! changed by appending one event at the next version slot
//! ([`InventoryHandler`]). Contention between writers is resolved by the
//! store's version fence, not by locks.

pub mod aggregate;
pub mod error;
pub mod handlers;

pub use aggregate::StockLevel;
pub use error::{InventoryError, Result};
pub use handlers::InventoryHandler;
