use common::OrderId;
use event_store::EventStoreError;
use thiserror::Error;

/// Errors produced by the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The charge was declined.
    ///
    /// A rejection is a recorded decision; retrying it cannot change the
    /// outcome.
    #[error("payment rejected for order {order_id}: amount {amount} exceeds the approval limit")]
    Rejected { order_id: OrderId, amount: i64 },

    /// The charge amount was not positive.
    #[error("invalid amount {amount}: must be positive")]
    InvalidAmount { amount: i64 },

    /// The event store rejected or failed the operation.
    #[error("event store error: {0}")]
    Store(#[from] EventStoreError),
}

impl PaymentError {
    /// Whether retrying the charge can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Store(_))
    }
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
