use common::ProductId;
use event_store::EventStoreError;
use thiserror::Error;

/// Errors surfaced while projecting events into the read model.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The event log or checkpoint store failed.
    #[error("event store error: {0}")]
    Store(#[from] EventStoreError),

    /// An update targeted a read-model row that does not exist.
    #[error("read-model row not found for {product_id}")]
    RowNotFound { product_id: ProductId },
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
