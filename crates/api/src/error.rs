//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use event_store::EventStoreError;
use inventory::InventoryError;
use projections::ProjectionError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Soft check rejected the order; carries the (possibly stale)
    /// available count the client saw.
    OutOfStock { available: i64 },
    /// Inventory command error.
    Inventory(InventoryError),
    /// Saga coordination error.
    Saga(SagaError),
    /// Read-model query error.
    Projection(ProjectionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::OutOfStock { available } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "out of stock",
                    "available": available,
                }),
            ),
            ApiError::Inventory(err) => inventory_error_to_response(err),
            ApiError::Saga(err) => {
                tracing::error!(error = %err, "saga coordination error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": err.to_string() }),
                )
            }
            ApiError::Projection(err) => {
                tracing::error!(error = %err, "read model error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": err.to_string() }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn inventory_error_to_response(err: InventoryError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        InventoryError::InsufficientStock { .. } => StatusCode::CONFLICT,
        InventoryError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
        InventoryError::Store(EventStoreError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
        InventoryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, serde_json::json!({ "error": err.to_string() }))
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Projection(err)
    }
}
