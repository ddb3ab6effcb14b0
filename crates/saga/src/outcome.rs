use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::SagaError;

/// The three steps of the order saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaStep {
    /// Reserve stock for the order.
    Reserve,
    /// Charge the order.
    Payment,
    /// Release the reservation (compensation).
    Release,
}

impl SagaStep {
    /// Returns the step name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::Reserve => "reserve",
            SagaStep::Payment => "payment",
            SagaStep::Release => "release",
        }
    }

    /// Parses a step name back into a step.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reserve" => Some(SagaStep::Reserve),
            "payment" => Some(SagaStep::Payment),
            "release" => Some(SagaStep::Release),
            _ => None,
        }
    }
}

impl std::fmt::Display for SagaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded step result.
///
/// The outcome log is the saga's durability: the coordinator writes one
/// row per finished step, and a restarted process re-derives the saga's
/// position from the rows alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub order_id: OrderId,
    pub step: SagaStep,
    pub succeeded: bool,
    /// Failure reason of the last attempt, for failed outcomes.
    pub reason: Option<String>,
    /// Attempts the step consumed under its retry policy.
    pub attempts: u32,
    pub recorded_at: DateTime<Utc>,
}

impl StepOutcome {
    /// Records a successful step.
    pub fn success(order_id: OrderId, step: SagaStep, attempts: u32) -> Self {
        Self {
            order_id,
            step,
            succeeded: true,
            reason: None,
            attempts,
            recorded_at: Utc::now(),
        }
    }

    /// Records a failed step.
    pub fn failure(
        order_id: OrderId,
        step: SagaStep,
        reason: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            order_id,
            step,
            succeeded: false,
            reason: Some(reason.into()),
            attempts,
            recorded_at: Utc::now(),
        }
    }
}

/// Durable storage for step outcomes.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Appends an outcome to an order's log.
    async fn record(&self, outcome: StepOutcome) -> Result<(), SagaError>;

    /// Returns an order's outcomes in recording order.
    async fn list(&self, order_id: &OrderId) -> Result<Vec<StepOutcome>, SagaError>;
}

/// In-memory outcome storage.
#[derive(Clone, Default)]
pub struct InMemoryOutcomeStore {
    outcomes: Arc<RwLock<HashMap<OrderId, Vec<StepOutcome>>>>,
}

impl InMemoryOutcomeStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeStore for InMemoryOutcomeStore {
    async fn record(&self, outcome: StepOutcome) -> Result<(), SagaError> {
        self.outcomes
            .write()
            .await
            .entry(outcome.order_id.clone())
            .or_default()
            .push(outcome);
        Ok(())
    }

    async fn list(&self, order_id: &OrderId) -> Result<Vec<StepOutcome>, SagaError> {
        Ok(self
            .outcomes
            .read()
            .await
            .get(order_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outcomes_are_listed_in_recording_order() {
        let store = InMemoryOutcomeStore::new();
        let order = OrderId::new("ORD-1");

        store
            .record(StepOutcome::success(order.clone(), SagaStep::Reserve, 1))
            .await
            .unwrap();
        store
            .record(StepOutcome::failure(
                order.clone(),
                SagaStep::Payment,
                "declined",
                1,
            ))
            .await
            .unwrap();

        let outcomes = store.list(&order).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].step, SagaStep::Reserve);
        assert!(outcomes[0].succeeded);
        assert_eq!(outcomes[1].step, SagaStep::Payment);
        assert_eq!(outcomes[1].reason.as_deref(), Some("declined"));
    }

    #[tokio::test]
    async fn unknown_order_has_no_outcomes() {
        let store = InMemoryOutcomeStore::new();
        let outcomes = store.list(&OrderId::new("nope")).await.unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn orders_are_isolated() {
        let store = InMemoryOutcomeStore::new();

        store
            .record(StepOutcome::success(
                OrderId::new("ORD-1"),
                SagaStep::Reserve,
                1,
            ))
            .await
            .unwrap();

        assert_eq!(store.list(&OrderId::new("ORD-1")).await.unwrap().len(), 1);
        assert!(store.list(&OrderId::new("ORD-2")).await.unwrap().is_empty());
    }
}
