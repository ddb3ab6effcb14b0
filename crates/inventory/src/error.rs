use common::ProductId;
use event_store::EventStoreError;
use thiserror::Error;

/// Errors produced by inventory command handlers.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The authoritative check at append time found too little stock.
    #[error("insufficient stock for {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// The command carried a non-positive quantity.
    #[error("invalid quantity {quantity}: must be positive")]
    InvalidQuantity { quantity: i64 },

    /// The event store rejected or failed the operation.
    #[error("event store error: {0}")]
    Store(#[from] EventStoreError),
}

impl InventoryError {
    /// Whether retrying the whole command (re-read, re-check, re-append)
    /// can succeed.
    ///
    /// A lost version race or a store fault is worth retrying; a failed
    /// stock check or a bad quantity is a decision and is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            InventoryError::InsufficientStock { .. } | InventoryError::InvalidQuantity { .. } => {
                false
            }
            InventoryError::Store(EventStoreError::VersionGap { .. }) => false,
            InventoryError::Store(_) => true,
        }
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
