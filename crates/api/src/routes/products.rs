//! Product view query and stock replenishment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Deserialize)]
pub struct AddStockRequest {
    pub qty: i64,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub product_id: String,
    pub available: i64,
    pub last_applied_version: i64,
}

#[derive(Serialize)]
pub struct StockAddedResponse {
    pub product_id: String,
    pub version: i64,
}

/// GET /products/{id} — current (possibly lagging) read-model row.
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = ProductId::new(id.as_str());
    let view = state
        .views
        .get(&product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;

    Ok(Json(ProductResponse {
        product_id: view.product_id.to_string(),
        available: view.available,
        last_applied_version: view.last_applied_version.as_i64(),
    }))
}

/// POST /products/{id}/stock — replenish stock (operator path).
#[tracing::instrument(skip(state, req), fields(product_id = %id))]
pub async fn add_stock<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AddStockRequest>,
) -> Result<Json<StockAddedResponse>, ApiError> {
    let product_id = ProductId::new(id.as_str());
    let version = state.inventory.add_stock(&product_id, req.qty, None).await?;

    Ok(Json(StockAddedResponse {
        product_id: id,
        version: version.as_i64(),
    }))
}
