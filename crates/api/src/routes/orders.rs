//! Order submission and saga status endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId};
use event_store::EventStore;
use inventory::InventoryHandler;
use payment::PaymentProcessor;
use projections::ReadModelStore;
use saga::{OrderRequest, OutcomeStore, SagaCoordinator};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::gate::{AcceptanceGate, GateDecision};

/// Coordinator wired to the real handlers over event store `S`.
pub type OrderCoordinator<S> =
    SagaCoordinator<InventoryHandler<S>, PaymentProcessor<S>, dyn OutcomeStore>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub gate: AcceptanceGate<Arc<dyn ReadModelStore>>,
    pub inventory: InventoryHandler<S>,
    pub coordinator: OrderCoordinator<S>,
    pub views: Arc<dyn ReadModelStore>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct SubmitOrderRequest {
    pub order_id: String,
    pub product_id: String,
    pub qty: i64,
    pub amount: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderAcceptedResponse {
    pub saga_id: String,
    pub order_id: String,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct SagaStatusResponse {
    pub order_id: String,
    pub state: String,
    pub steps: Vec<StepOutcomeResponse>,
}

#[derive(Serialize)]
pub struct StepOutcomeResponse {
    pub step: String,
    pub succeeded: bool,
    pub reason: Option<String>,
    pub attempts: u32,
}

// -- Handlers --

/// POST /orders — soft check against the read model, then start the saga.
///
/// Responds as soon as the saga is launched; its terminal state is not
/// part of the response and is observed via the status endpoint.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id))]
pub async fn submit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SubmitOrderRequest>,
) -> Result<(StatusCode, Json<OrderAcceptedResponse>), ApiError> {
    if req.order_id.is_empty() {
        return Err(ApiError::BadRequest("order_id must not be empty".into()));
    }
    if req.qty <= 0 {
        return Err(ApiError::BadRequest("qty must be positive".into()));
    }
    if req.amount <= 0 {
        return Err(ApiError::BadRequest("amount must be positive".into()));
    }

    let product_id = ProductId::new(req.product_id.as_str());
    match state.gate.admit(&product_id, req.qty).await? {
        GateDecision::Rejected { available } => Err(ApiError::OutOfStock { available }),
        GateDecision::Accepted => {
            let request = OrderRequest {
                order_id: OrderId::new(req.order_id.as_str()),
                product_id,
                quantity: req.qty,
                amount: req.amount,
            };
            let saga_id = request.saga_id();

            let coordinator = state.coordinator.clone();
            tokio::spawn(async move {
                if let Err(e) = coordinator.execute(request).await {
                    tracing::error!(error = %e, "saga execution error");
                }
            });

            Ok((
                StatusCode::ACCEPTED,
                Json(OrderAcceptedResponse {
                    saga_id,
                    order_id: req.order_id,
                    status: "processing started",
                }),
            ))
        }
    }
}

/// GET /orders/{id}/saga — observed saga position for an order.
pub async fn saga_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SagaStatusResponse>, ApiError> {
    let status = state
        .coordinator
        .status(&OrderId::new(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no saga recorded for order {id}")))?;

    Ok(Json(SagaStatusResponse {
        order_id: status.order_id.to_string(),
        state: status.state.to_string(),
        steps: status
            .outcomes
            .into_iter()
            .map(|o| StepOutcomeResponse {
                step: o.step.to_string(),
                succeeded: o.succeeded,
                reason: o.reason,
                attempts: o.attempts,
            })
            .collect(),
    }))
}
