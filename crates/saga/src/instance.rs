use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::outcome::{SagaStep, StepOutcome};
use crate::state::SagaState;

/// A customer order driving one saga execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Charge amount in cents.
    pub amount: i64,
}

impl OrderRequest {
    /// The acceptance token handed back to the submitter.
    pub fn saga_id(&self) -> String {
        format!("order-{}", self.order_id)
    }
}

/// Live state of one saga execution.
///
/// Owned solely by the coordinator while the saga runs; after a terminal
/// state the instance survives only as its recorded step outcomes, from
/// which [`SagaInstance::recover`] rebuilds an equivalent instance.
#[derive(Debug, Clone)]
pub struct SagaInstance {
    request: OrderRequest,
    state: SagaState,
    reserve_attempts: u32,
    payment_attempts: u32,
    release_attempts: u32,
    failure_reason: Option<String>,
}

impl SagaInstance {
    /// Creates a fresh instance for an accepted order.
    pub fn new(request: OrderRequest) -> Self {
        Self {
            request,
            state: SagaState::Started,
            reserve_attempts: 0,
            payment_attempts: 0,
            release_attempts: 0,
            failure_reason: None,
        }
    }

    /// Rebuilds an instance from the persisted outcome log.
    ///
    /// The derived state is the position the coordinator would have been
    /// in directly after the last recorded outcome, so `resume` can pick
    /// up exactly where the interrupted run stopped.
    pub fn recover(request: OrderRequest, outcomes: &[StepOutcome]) -> Self {
        let mut saga = Self::new(request);

        for outcome in outcomes {
            match (outcome.step, outcome.succeeded) {
                (SagaStep::Reserve, true) => {
                    saga.state = SagaState::StockReserved;
                    saga.reserve_attempts = outcome.attempts;
                }
                (SagaStep::Reserve, false) => {
                    saga.state = SagaState::Failed;
                    saga.reserve_attempts = outcome.attempts;
                    saga.failure_reason = outcome.reason.clone();
                }
                (SagaStep::Payment, true) => {
                    saga.state = SagaState::Completed;
                    saga.payment_attempts = outcome.attempts;
                }
                (SagaStep::Payment, false) => {
                    saga.state = SagaState::Compensating;
                    saga.payment_attempts = outcome.attempts;
                    saga.failure_reason = outcome.reason.clone();
                }
                (SagaStep::Release, true) => {
                    saga.state = SagaState::Compensated;
                    saga.release_attempts = outcome.attempts;
                }
                (SagaStep::Release, false) => {
                    saga.state = SagaState::CompensationFailed;
                    saga.release_attempts = outcome.attempts;
                    saga.failure_reason = outcome.reason.clone();
                }
            }
        }

        saga
    }

    /// Derives only the state from an outcome log (for status queries).
    pub fn state_from_outcomes(outcomes: &[StepOutcome]) -> SagaState {
        let request = OrderRequest {
            order_id: OrderId::new(""),
            product_id: ProductId::new(""),
            quantity: 0,
            amount: 0,
        };
        Self::recover(request, outcomes).state
    }

    /// Moves the saga along one edge of the transition graph.
    pub fn advance(&mut self, next: SagaState) -> Result<(), SagaError> {
        if !self.state.can_transition_to(next) {
            return Err(SagaError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(order_id = %self.request.order_id, from = %self.state, to = %next, "saga transition");
        self.state = next;
        Ok(())
    }

    /// The order being processed.
    pub fn request(&self) -> &OrderRequest {
        &self.request
    }

    /// Current state.
    pub fn state(&self) -> SagaState {
        self.state
    }

    /// Failure reason, if any step failed.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub(crate) fn set_failure_reason(&mut self, reason: impl Into<String>) {
        self.failure_reason = Some(reason.into());
    }

    pub(crate) fn set_attempts(&mut self, step: SagaStep, attempts: u32) {
        match step {
            SagaStep::Reserve => self.reserve_attempts = attempts,
            SagaStep::Payment => self.payment_attempts = attempts,
            SagaStep::Release => self.release_attempts = attempts,
        }
    }

    /// Attempts consumed by a step so far.
    pub fn attempts(&self, step: SagaStep) -> u32 {
        match step {
            SagaStep::Reserve => self.reserve_attempts,
            SagaStep::Payment => self.payment_attempts,
            SagaStep::Release => self.release_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OrderRequest {
        OrderRequest {
            order_id: OrderId::new("ORD-1"),
            product_id: ProductId::new("SKU-001"),
            quantity: 3,
            amount: 500,
        }
    }

    #[test]
    fn saga_id_is_derived_from_the_order() {
        assert_eq!(request().saga_id(), "order-ORD-1");
    }

    #[test]
    fn advance_rejects_illegal_edges() {
        let mut saga = SagaInstance::new(request());
        let result = saga.advance(SagaState::Completed);
        assert!(matches!(result, Err(SagaError::InvalidTransition { .. })));
        assert_eq!(saga.state(), SagaState::Started);
    }

    #[test]
    fn advance_walks_the_happy_path() {
        let mut saga = SagaInstance::new(request());
        saga.advance(SagaState::ReservingStock).unwrap();
        saga.advance(SagaState::StockReserved).unwrap();
        saga.advance(SagaState::ProcessingPayment).unwrap();
        saga.advance(SagaState::Completed).unwrap();
        assert!(saga.state().is_terminal());
    }

    #[test]
    fn recover_with_no_outcomes_starts_fresh() {
        let saga = SagaInstance::recover(request(), &[]);
        assert_eq!(saga.state(), SagaState::Started);
    }

    #[test]
    fn recover_derives_every_position() {
        let order = OrderId::new("ORD-1");
        let reserve_ok = StepOutcome::success(order.clone(), SagaStep::Reserve, 2);
        let reserve_err = StepOutcome::failure(order.clone(), SagaStep::Reserve, "out of stock", 1);
        let payment_ok = StepOutcome::success(order.clone(), SagaStep::Payment, 1);
        let payment_err = StepOutcome::failure(order.clone(), SagaStep::Payment, "declined", 1);
        let release_ok = StepOutcome::success(order.clone(), SagaStep::Release, 1);
        let release_err = StepOutcome::failure(order.clone(), SagaStep::Release, "store down", 3);

        let cases: Vec<(Vec<StepOutcome>, SagaState)> = vec![
            (vec![reserve_err.clone()], SagaState::Failed),
            (vec![reserve_ok.clone()], SagaState::StockReserved),
            (
                vec![reserve_ok.clone(), payment_ok.clone()],
                SagaState::Completed,
            ),
            (
                vec![reserve_ok.clone(), payment_err.clone()],
                SagaState::Compensating,
            ),
            (
                vec![reserve_ok.clone(), payment_err.clone(), release_ok.clone()],
                SagaState::Compensated,
            ),
            (
                vec![reserve_ok.clone(), payment_err.clone(), release_err.clone()],
                SagaState::CompensationFailed,
            ),
        ];

        for (outcomes, expected) in cases {
            let saga = SagaInstance::recover(request(), &outcomes);
            assert_eq!(saga.state(), expected, "outcomes: {outcomes:?}");
        }
    }

    #[test]
    fn recover_carries_attempts_and_reason() {
        let order = OrderId::new("ORD-1");
        let outcomes = vec![
            StepOutcome::success(order.clone(), SagaStep::Reserve, 2),
            StepOutcome::failure(order.clone(), SagaStep::Payment, "declined", 1),
        ];

        let saga = SagaInstance::recover(request(), &outcomes);
        assert_eq!(saga.attempts(SagaStep::Reserve), 2);
        assert_eq!(saga.attempts(SagaStep::Payment), 1);
        assert_eq!(saga.failure_reason(), Some("declined"));
    }
}
