//! HTTP submission surface for the order saga system.
//!
//! Wires the acceptance gate, the saga coordinator and the projector
//! together behind a small axum router, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod gate;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use event_store::{CheckpointStore, EventStore};
use gate::AcceptanceGate;
use inventory::InventoryHandler;
use metrics_exporter_prometheus::PrometheusHandle;
use payment::{PaymentConfig, PaymentProcessor};
use projections::{Projector, ProjectorConfig, ReadModelStore};
use saga::{OutcomeStore, SagaConfig, SagaCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::submit::<S>))
        .route("/orders/{id}/saga", get(routes::orders::saga_status::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/{id}/stock", post(routes::products::add_stock::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the application state and its projector over concrete stores.
///
/// The projector is returned separately: the caller decides whether to
/// run it on a background task (the server) or drive it by hand (tests).
pub fn create_state<S, C, R>(
    store: S,
    checkpoints: C,
    views: R,
    outcomes: Arc<dyn OutcomeStore>,
    saga_config: SagaConfig,
) -> (Arc<AppState<S>>, Projector<S, C, R>)
where
    S: EventStore + Clone + 'static,
    C: CheckpointStore,
    R: ReadModelStore + Clone + 'static,
{
    let inventory = InventoryHandler::new(store.clone());
    let payment = PaymentProcessor::new(store.clone(), PaymentConfig::default());
    let coordinator = SagaCoordinator::new(
        Arc::new(inventory.clone()),
        Arc::new(payment),
        outcomes,
        saga_config,
    );

    let views_dyn: Arc<dyn ReadModelStore> = Arc::new(views.clone());
    let gate = AcceptanceGate::new(views_dyn.clone());
    let projector = Projector::new(
        store.clone(),
        checkpoints,
        views,
        ProjectorConfig::default(),
    );

    let state = Arc::new(AppState {
        gate,
        inventory,
        coordinator,
        views: views_dyn,
    });

    (state, projector)
}
