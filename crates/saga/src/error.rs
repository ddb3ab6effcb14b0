use thiserror::Error;

use crate::state::SagaState;

/// Errors surfaced by the saga coordinator itself.
///
/// Step failures are not errors at this level; they are recorded
/// outcomes that drive the state machine. Only broken invariants and
/// infrastructure faults end up here.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A transition outside the saga's state graph was attempted.
    #[error("invalid saga transition from {from} to {to}")]
    InvalidTransition { from: SagaState, to: SagaState },

    /// The step-outcome store failed.
    #[error("outcome store error: {0}")]
    OutcomeStore(String),
}
