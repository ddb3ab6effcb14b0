use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::retry::RetryPolicy;

/// Classification of one failed step attempt.
///
/// This is the whole contract between a step implementation and the
/// runner: a transient failure is retried under the policy, a terminal
/// one is a decision and ends the step immediately.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// The attempt failed for a reason retrying cannot change
    /// (insufficient stock, payment declined).
    #[error("{0}")]
    Terminal(String),

    /// The attempt failed transiently (lost a version race, store fault,
    /// timeout) and a fresh attempt may succeed.
    #[error("{0}")]
    Transient(String),
}

/// A completed step, with the number of attempts it took.
#[derive(Debug, Clone)]
pub struct StepSuccess<T> {
    pub value: T,
    pub attempts: u32,
}

/// A step that did not complete.
#[derive(Debug, Clone, Error)]
pub enum StepFailure {
    /// An attempt returned a terminal error.
    #[error("step '{step}' failed: {reason}")]
    Terminal {
        step: String,
        reason: String,
        attempts: u32,
    },

    /// Every attempt in the budget failed transiently.
    #[error("step '{step}' exhausted {attempts} attempts: {reason}")]
    Exhausted {
        step: String,
        reason: String,
        attempts: u32,
    },
}

impl StepFailure {
    /// The failure reason of the last attempt.
    pub fn reason(&self) -> &str {
        match self {
            StepFailure::Terminal { reason, .. } | StepFailure::Exhausted { reason, .. } => reason,
        }
    }

    /// How many attempts were made.
    pub fn attempts(&self) -> u32 {
        match self {
            StepFailure::Terminal { attempts, .. } | StepFailure::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Executes named saga steps.
///
/// Each attempt runs under a bounded timeout; a timed-out attempt counts
/// as transient and feeds the same backoff as any other transient
/// failure. The runner holds no state of its own; durability lives in
/// the step outcomes the coordinator records.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepRunner;

impl StepRunner {
    /// Creates a runner.
    pub fn new() -> Self {
        Self
    }

    /// Runs `op` until it succeeds, fails terminally, or the policy's
    /// attempt budget is spent.
    pub async fn run<T, F, Fut>(
        &self,
        step: &str,
        policy: &RetryPolicy,
        step_timeout: Duration,
        op: F,
    ) -> Result<StepSuccess<T>, StepFailure>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StepError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(step_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(StepError::Transient(format!(
                    "attempt timed out after {step_timeout:?}"
                ))),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(step, attempt, "step recovered after retry");
                    }
                    return Ok(StepSuccess { value, attempts: attempt });
                }
                Err(StepError::Terminal(reason)) => {
                    tracing::info!(step, attempt, %reason, "step failed terminally");
                    return Err(StepFailure::Terminal {
                        step: step.to_string(),
                        reason,
                        attempts: attempt,
                    });
                }
                Err(StepError::Transient(reason)) => {
                    if attempt >= policy.max_attempts {
                        tracing::warn!(step, attempt, %reason, "step retry budget exhausted");
                        return Err(StepFailure::Exhausted {
                            step: step.to_string(),
                            reason,
                            attempts: attempt,
                        });
                    }
                    let delay = policy.delay_for_attempt(attempt);
                    metrics::counter!("saga_step_retries_total").increment(1);
                    tracing::warn!(step, attempt, ?delay, %reason, "step attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Launches a future on a task detached from the caller.
    ///
    /// The spawned work keeps running even if the future that called this
    /// is dropped: compensation must run to conclusion regardless of
    /// what happens to the saga that started it.
    pub fn spawn_detached<T, Fut>(&self, fut: Fut) -> JoinHandle<T>
    where
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(fut)
    }
}
