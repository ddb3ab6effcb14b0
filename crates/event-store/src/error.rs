use common::StreamId;
use thiserror::Error;

use crate::Version;

/// Errors surfaced by the event log and checkpoint stores.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Another writer already committed the claimed version slot.
    ///
    /// Safe to retry from a fresh read of the stream.
    #[error("concurrency conflict on stream {stream_id}: version {version} already committed")]
    ConcurrencyConflict { stream_id: StreamId, version: Version },

    /// The claimed version would leave a gap in the stream.
    #[error("invalid version {version} for stream {stream_id}: expected {expected}")]
    VersionGap {
        stream_id: StreamId,
        version: Version,
        expected: Version,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
