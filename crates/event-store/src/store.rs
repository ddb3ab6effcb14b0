use std::pin::Pin;

use async_trait::async_trait;
use common::StreamId;
use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::{EventRecord, Result, Version};

/// Position in the global log.
///
/// Cursors order all events across streams and never repeat. A feed
/// resumed from cursor `c` yields strictly after `c`, so persisting the
/// cursor of the last observed event is enough to restart a consumer
/// without gaps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cursor(i64);

impl Cursor {
    /// Creates a cursor from a raw sequence number.
    pub fn new(seq: i64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence number.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An endless, ordered feed of `(cursor, event)` pairs.
pub type EventFeed = Pin<Box<dyn Stream<Item = Result<(Cursor, EventRecord)>> + Send>>;

/// The append-only log.
///
/// All implementations must be thread-safe and must deliver events for
/// one stream in version order through both `read_stream` and the feed.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a single event to its stream.
    ///
    /// The `(stream_id, version)` slot is claimed exactly once; a second
    /// writer targeting the same slot gets
    /// [`ConcurrencyConflict`](crate::EventStoreError::ConcurrencyConflict)
    /// and must re-read the stream before retrying. If the event carries a
    /// dedup key already present on the stream, nothing is written and the
    /// previously committed version is returned.
    async fn append(&self, event: EventRecord) -> Result<Version>;

    /// Returns all events of one stream in ascending version order.
    async fn read_stream(&self, stream_id: &StreamId) -> Result<Vec<EventRecord>>;

    /// Returns up to `limit` events strictly after `after`, in log order.
    ///
    /// `None` starts from the beginning of the log.
    async fn read_since(
        &self,
        after: Option<Cursor>,
        limit: usize,
    ) -> Result<Vec<(Cursor, EventRecord)>>;

    /// Opens a live feed starting strictly after `after`.
    ///
    /// With `after = None` the feed replays the complete history before
    /// tailing new appends; it never starts at "now".
    async fn subscribe(&self, after: Option<Cursor>) -> Result<EventFeed>;

    /// Returns the highest committed version of a stream, if any.
    async fn latest_version(&self, stream_id: &StreamId) -> Result<Option<Version>>;
}

/// Durable cursor storage for feed consumers.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns the last persisted cursor for a consumer, if any.
    async fn get(&self, projector_id: &str) -> Result<Option<Cursor>>;

    /// Persists a cursor for a consumer (upsert).
    async fn set(&self, projector_id: &str, cursor: Cursor) -> Result<()>;
}
