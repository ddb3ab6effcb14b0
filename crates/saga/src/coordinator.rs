use std::sync::Arc;

use common::OrderId;

use crate::config::SagaConfig;
use crate::engine::StepRunner;
use crate::error::SagaError;
use crate::instance::{OrderRequest, SagaInstance};
use crate::outcome::{OutcomeStore, SagaStep, StepOutcome};
use crate::services::{InventoryService, PaymentService};
use crate::state::SagaState;

/// Terminal summary of a saga execution.
#[derive(Debug, Clone)]
pub struct SagaReport {
    /// Acceptance token handed to the submitter.
    pub saga_id: String,
    pub order_id: OrderId,
    pub state: SagaState,
    pub failure_reason: Option<String>,
}

/// Observed position of a saga, derived from its recorded outcomes.
#[derive(Debug, Clone)]
pub struct SagaStatus {
    pub order_id: OrderId,
    pub state: SagaState,
    pub outcomes: Vec<StepOutcome>,
}

/// Drives order sagas through their state machine.
///
/// One coordinator serves many concurrent sagas; nothing here serializes
/// orders against each other. Cross-step consistency comes from each step
/// being independently retriable (dedup keys make retries idempotent) and
/// from compensation only being reachable after a committed reservation.
pub struct SagaCoordinator<I, P, O>
where
    I: InventoryService,
    P: PaymentService,
    O: OutcomeStore + ?Sized,
{
    inventory: Arc<I>,
    payment: Arc<P>,
    outcomes: Arc<O>,
    runner: StepRunner,
    config: SagaConfig,
}

impl<I, P, O> Clone for SagaCoordinator<I, P, O>
where
    I: InventoryService,
    P: PaymentService,
    O: OutcomeStore + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            inventory: self.inventory.clone(),
            payment: self.payment.clone(),
            outcomes: self.outcomes.clone(),
            runner: self.runner,
            config: self.config.clone(),
        }
    }
}

impl<I, P, O> SagaCoordinator<I, P, O>
where
    I: InventoryService + 'static,
    P: PaymentService + 'static,
    O: OutcomeStore + ?Sized + 'static,
{
    /// Creates a coordinator over the given services.
    pub fn new(inventory: Arc<I>, payment: Arc<P>, outcomes: Arc<O>, config: SagaConfig) -> Self {
        Self {
            inventory,
            payment,
            outcomes,
            runner: StepRunner::new(),
            config,
        }
    }

    /// Runs a fresh saga for an accepted order to a terminal state.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn execute(&self, request: OrderRequest) -> Result<SagaReport, SagaError> {
        metrics::counter!("saga_started_total").increment(1);
        let started = std::time::Instant::now();

        let mut saga = SagaInstance::new(request);
        self.drive(&mut saga).await?;

        metrics::histogram!("saga_duration_seconds").record(started.elapsed().as_secs_f64());
        if saga.state() == SagaState::Completed {
            metrics::counter!("saga_completed_total").increment(1);
        }
        tracing::info!(state = %saga.state(), "saga finished");
        Ok(Self::report(saga))
    }

    /// Continues an interrupted saga from its last recorded step outcome.
    ///
    /// Steps that already recorded success are not re-invoked; the rest
    /// run as usual, with their dedup keys absorbing any step whose append
    /// committed before the crash without leaving an outcome.
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn resume(&self, request: OrderRequest) -> Result<SagaReport, SagaError> {
        let outcomes = self.outcomes.list(&request.order_id).await?;
        let mut saga = SagaInstance::recover(request, &outcomes);

        if !saga.state().is_terminal() {
            tracing::info!(state = %saga.state(), "resuming interrupted saga");
            self.drive(&mut saga).await?;
        }
        Ok(Self::report(saga))
    }

    /// Returns the observed position of an order's saga, if any step has
    /// recorded an outcome yet.
    pub async fn status(&self, order_id: &OrderId) -> Result<Option<SagaStatus>, SagaError> {
        let outcomes = self.outcomes.list(order_id).await?;
        if outcomes.is_empty() {
            return Ok(None);
        }
        Ok(Some(SagaStatus {
            order_id: order_id.clone(),
            state: SagaInstance::state_from_outcomes(&outcomes),
            outcomes,
        }))
    }

    fn report(saga: SagaInstance) -> SagaReport {
        SagaReport {
            saga_id: saga.request().saga_id(),
            order_id: saga.request().order_id.clone(),
            state: saga.state(),
            failure_reason: saga.failure_reason().map(str::to_string),
        }
    }

    async fn drive(&self, saga: &mut SagaInstance) -> Result<(), SagaError> {
        while !saga.state().is_terminal() {
            match saga.state() {
                SagaState::Started => saga.advance(SagaState::ReservingStock)?,
                SagaState::ReservingStock => self.reserve_stock(saga).await?,
                SagaState::StockReserved => saga.advance(SagaState::ProcessingPayment)?,
                SagaState::ProcessingPayment => self.process_payment(saga).await?,
                SagaState::Compensating => self.compensate(saga).await?,
                SagaState::Completed
                | SagaState::Failed
                | SagaState::Compensated
                | SagaState::CompensationFailed => break,
            }
        }
        Ok(())
    }

    async fn reserve_stock(&self, saga: &mut SagaInstance) -> Result<(), SagaError> {
        let request = saga.request().clone();
        let key = format!("reserve:{}", request.order_id);
        let inventory = self.inventory.clone();

        let result = self
            .runner
            .run(
                &self.config.reserve_step,
                &self.config.retry,
                self.config.step_timeout,
                || {
                    let inventory = inventory.clone();
                    let product_id = request.product_id.clone();
                    let key = key.clone();
                    async move { inventory.reserve(&product_id, request.quantity, &key).await }
                },
            )
            .await;

        match result {
            Ok(success) => {
                saga.set_attempts(SagaStep::Reserve, success.attempts);
                self.outcomes
                    .record(StepOutcome::success(
                        request.order_id.clone(),
                        SagaStep::Reserve,
                        success.attempts,
                    ))
                    .await?;
                saga.advance(SagaState::StockReserved)
            }
            Err(failure) => {
                // Refused or budget spent before any append committed:
                // terminal, and there is nothing to undo.
                saga.set_attempts(SagaStep::Reserve, failure.attempts());
                saga.set_failure_reason(failure.reason());
                self.outcomes
                    .record(StepOutcome::failure(
                        request.order_id.clone(),
                        SagaStep::Reserve,
                        failure.reason(),
                        failure.attempts(),
                    ))
                    .await?;
                metrics::counter!("saga_failed_total").increment(1);
                tracing::warn!(reason = %failure.reason(), "reservation failed, saga failed");
                saga.advance(SagaState::Failed)
            }
        }
    }

    async fn process_payment(&self, saga: &mut SagaInstance) -> Result<(), SagaError> {
        let request = saga.request().clone();
        let key = format!("charge:{}", request.order_id);
        let payment = self.payment.clone();

        let result = self
            .runner
            .run(
                &self.config.payment_step,
                &self.config.retry,
                self.config.step_timeout,
                || {
                    let payment = payment.clone();
                    let order_id = request.order_id.clone();
                    let key = key.clone();
                    async move { payment.charge(&order_id, request.amount, &key).await }
                },
            )
            .await;

        match result {
            Ok(success) => {
                saga.set_attempts(SagaStep::Payment, success.attempts);
                self.outcomes
                    .record(StepOutcome::success(
                        request.order_id.clone(),
                        SagaStep::Payment,
                        success.attempts,
                    ))
                    .await?;
                saga.advance(SagaState::Completed)
            }
            Err(failure) => {
                saga.set_attempts(SagaStep::Payment, failure.attempts());
                saga.set_failure_reason(failure.reason());
                self.outcomes
                    .record(StepOutcome::failure(
                        request.order_id.clone(),
                        SagaStep::Payment,
                        failure.reason(),
                        failure.attempts(),
                    ))
                    .await?;
                tracing::warn!(reason = %failure.reason(), "payment failed, compensating");
                saga.advance(SagaState::Compensating)
            }
        }
    }

    async fn compensate(&self, saga: &mut SagaInstance) -> Result<(), SagaError> {
        let request = saga.request().clone();
        let inventory = self.inventory.clone();
        let outcomes = self.outcomes.clone();
        let runner = self.runner;
        let config = self.config.clone();

        metrics::counter!("saga_compensations_total").increment(1);
        tracing::info!("releasing reservation");

        // Detached so teardown of this saga cannot cancel the release;
        // the outcome is recorded from inside the detached context so a
        // torn-down parent still leaves a durable trace.
        let order_id = request.order_id.clone();
        let handle = self.runner.spawn_detached(async move {
            let key = format!("release:{}", request.order_id);
            let result = runner
                .run(
                    &config.release_step,
                    &config.retry,
                    config.step_timeout,
                    || {
                        let inventory = inventory.clone();
                        let product_id = request.product_id.clone();
                        let key = key.clone();
                        async move { inventory.release(&product_id, request.quantity, &key).await }
                    },
                )
                .await;

            let outcome = match &result {
                Ok(success) => StepOutcome::success(
                    request.order_id.clone(),
                    SagaStep::Release,
                    success.attempts,
                ),
                Err(failure) => StepOutcome::failure(
                    request.order_id.clone(),
                    SagaStep::Release,
                    failure.reason(),
                    failure.attempts(),
                ),
            };
            if let Err(e) = outcomes.record(outcome).await {
                tracing::error!(error = %e, "failed to record release outcome");
            }

            result
                .map(|s| s.attempts)
                .map_err(|f| (f.reason().to_string(), f.attempts()))
        });

        match handle.await {
            Ok(Ok(attempts)) => {
                saga.set_attempts(SagaStep::Release, attempts);
                metrics::counter!("saga_compensated_total").increment(1);
                saga.advance(SagaState::Compensated)
            }
            Ok(Err((reason, attempts))) => {
                saga.set_attempts(SagaStep::Release, attempts);
                saga.set_failure_reason(reason.clone());
                metrics::counter!("saga_compensation_failed_total").increment(1);
                tracing::error!(
                    order_id = %order_id,
                    %reason,
                    "compensation exhausted, manual reconciliation required"
                );
                saga.advance(SagaState::CompensationFailed)
            }
            Err(join_err) => {
                let reason = format!("compensation task failed: {join_err}");
                let _ = self
                    .outcomes
                    .record(StepOutcome::failure(
                        order_id.clone(),
                        SagaStep::Release,
                        reason.clone(),
                        0,
                    ))
                    .await;
                saga.set_failure_reason(reason);
                metrics::counter!("saga_compensation_failed_total").increment(1);
                saga.advance(SagaState::CompensationFailed)
            }
        }
    }
}
