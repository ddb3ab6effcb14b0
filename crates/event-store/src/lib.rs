//! Append-only event log for the order saga system.
//!
//! Streams are keyed by [`common::StreamId`] and versioned per stream.
//! Appends are fenced by a uniqueness constraint on `(stream_id, version)`,
//! which is the optimistic concurrency mechanism every writer relies on:
//! read the stream, compute the next version, append, retry on conflict.
//!
//! The whole log is also observable as a resumable change feed, consumed
//! by the read-model projector via a persisted [`Cursor`] checkpoint.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{OrderId, ProductId, StreamId};
pub use error::{EventStoreError, Result};
pub use event::{EventKind, EventRecord, Version};
pub use memory::{InMemoryCheckpointStore, InMemoryEventStore};
pub use postgres::{PostgresCheckpointStore, PostgresEventStore};
pub use store::{CheckpointStore, Cursor, EventFeed, EventStore};
