use async_trait::async_trait;
use common::OrderId;
use sqlx::{PgPool, Row};

use crate::error::SagaError;
use crate::outcome::{OutcomeStore, SagaStep, StepOutcome};

/// PostgreSQL-backed outcome storage.
///
/// One row per finished step, ordered by insertion; this table is what
/// makes a saga recoverable across process restarts.
#[derive(Clone)]
pub struct PostgresOutcomeStore {
    pool: PgPool,
}

impl PostgresOutcomeStore {
    /// Creates a store on an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutcomeStore for PostgresOutcomeStore {
    async fn record(&self, outcome: StepOutcome) -> Result<(), SagaError> {
        sqlx::query(
            r#"
            INSERT INTO step_outcomes (order_id, step, succeeded, reason, attempts, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(outcome.order_id.as_str())
        .bind(outcome.step.as_str())
        .bind(outcome.succeeded)
        .bind(&outcome.reason)
        .bind(outcome.attempts as i64)
        .bind(outcome.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| SagaError::OutcomeStore(e.to_string()))?;
        Ok(())
    }

    async fn list(&self, order_id: &OrderId) -> Result<Vec<StepOutcome>, SagaError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, step, succeeded, reason, attempts, recorded_at
            FROM step_outcomes
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SagaError::OutcomeStore(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let step_name: String = row
                    .try_get("step")
                    .map_err(|e| SagaError::OutcomeStore(e.to_string()))?;
                let step = SagaStep::parse(&step_name).ok_or_else(|| {
                    SagaError::OutcomeStore(format!("unknown saga step '{step_name}'"))
                })?;
                let attempts: i64 = row
                    .try_get("attempts")
                    .map_err(|e| SagaError::OutcomeStore(e.to_string()))?;

                Ok(StepOutcome {
                    order_id: OrderId::new(
                        row.try_get::<String, _>("order_id")
                            .map_err(|e| SagaError::OutcomeStore(e.to_string()))?,
                    ),
                    step,
                    succeeded: row
                        .try_get("succeeded")
                        .map_err(|e| SagaError::OutcomeStore(e.to_string()))?,
                    reason: row
                        .try_get("reason")
                        .map_err(|e| SagaError::OutcomeStore(e.to_string()))?,
                    attempts: attempts as u32,
                    recorded_at: row
                        .try_get("recorded_at")
                        .map_err(|e| SagaError::OutcomeStore(e.to_string()))?,
                })
            })
            .collect()
    }
}
