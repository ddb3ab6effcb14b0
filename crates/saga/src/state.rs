use serde::{Deserialize, Serialize};

/// Position of a saga in its lifecycle.
///
/// ```text
/// Started ─► ReservingStock ─► StockReserved ─► ProcessingPayment ─► Completed
///                  │                                     │
///                  │ (insufficient stock)                │ (payment rejected)
///                  ▼                                     ▼
///               Failed                             Compensating ─► Compensated
///                                                        │
///                                                        ▼ (compensation exhausted)
///                                              CompensationFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Order accepted, nothing invoked yet.
    #[default]
    Started,

    /// The reserve step is being invoked.
    ReservingStock,

    /// The reservation committed.
    StockReserved,

    /// The payment step is being invoked.
    ProcessingPayment,

    /// Reservation and payment both committed (terminal).
    Completed,

    /// Reservation refused or its retry budget exhausted; nothing to undo
    /// (terminal).
    Failed,

    /// Payment refused; the reservation is being released.
    Compensating,

    /// The order failed but inventory was restored (terminal).
    Compensated,

    /// The release exhausted its retry budget; requires manual operator
    /// reconciliation (terminal).
    CompensationFailed,
}

impl SagaState {
    /// Whether the saga has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaState::Completed
                | SagaState::Failed
                | SagaState::Compensated
                | SagaState::CompensationFailed
        )
    }

    /// Whether an operator has to resolve this state by hand.
    pub fn needs_operator(&self) -> bool {
        matches!(self, SagaState::CompensationFailed)
    }

    /// Whether the transition graph permits moving to `next`.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        use SagaState::*;
        matches!(
            (self, next),
            (Started, ReservingStock)
                | (ReservingStock, StockReserved)
                | (ReservingStock, Failed)
                | (StockReserved, ProcessingPayment)
                | (ProcessingPayment, Completed)
                | (ProcessingPayment, Compensating)
                | (Compensating, Compensated)
                | (Compensating, CompensationFailed)
        )
    }

    /// Returns the state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Started => "Started",
            SagaState::ReservingStock => "ReservingStock",
            SagaState::StockReserved => "StockReserved",
            SagaState::ProcessingPayment => "ProcessingPayment",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
            SagaState::Compensating => "Compensating",
            SagaState::Compensated => "Compensated",
            SagaState::CompensationFailed => "CompensationFailed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
