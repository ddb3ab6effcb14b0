//! Shared identifier types used across the order saga system.

pub mod types;

pub use types::{OrderId, ProductId, StreamId};
