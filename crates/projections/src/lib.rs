//! Query side of the system.
//!
//! The [`Projector`] tails the event log's change feed and folds stock
//! events into one [`ProductView`] row per product. The view is
//! eventually consistent and deliberately non-authoritative: the only
//! consumer that may trust it is the acceptance gate's fail-fast check.
//!
//! Redelivery is expected (the feed is at-least-once across restarts);
//! the `last_applied_version` fence on each row makes re-application a
//! no-op instead of a double count.

pub mod error;
pub mod postgres;
pub mod projector;
pub mod read_model;

pub use error::{ProjectionError, Result};
pub use postgres::PostgresReadModelStore;
pub use projector::{Projector, ProjectorConfig};
pub use read_model::{InMemoryReadModelStore, InsertOutcome, ProductView, ReadModelStore};
