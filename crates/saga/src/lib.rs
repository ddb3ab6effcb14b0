//! Order saga.
//!
//! One saga per order sequences the two subsystem writes (reserve stock,
//! then charge payment) and releases the reservation when the charge is
//! refused. There is no atomic commit across the two streams; consistency
//! comes from each step being independently retriable and from the
//! compensation invariant: a release is only ever issued for an order
//! whose reservation committed.
//!
//! Steps run under a uniform retry policy ([`RetryPolicy`]) through the
//! [`StepRunner`]; every step's outcome is persisted ([`OutcomeStore`]) so
//! an interrupted saga can be resumed from its last recorded step after a
//! restart.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod instance;
pub mod outcome;
pub mod postgres;
pub mod retry;
pub mod services;
pub mod state;

pub use config::SagaConfig;
pub use coordinator::{SagaCoordinator, SagaReport, SagaStatus};
pub use engine::{StepError, StepFailure, StepRunner, StepSuccess};
pub use error::SagaError;
pub use instance::{OrderRequest, SagaInstance};
pub use outcome::{InMemoryOutcomeStore, OutcomeStore, SagaStep, StepOutcome};
pub use postgres::PostgresOutcomeStore;
pub use retry::RetryPolicy;
pub use services::{InventoryService, PaymentService};
pub use state::SagaState;
