//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use event_store::{
    CheckpointStore, EventStore, InMemoryCheckpointStore, InMemoryEventStore,
    PostgresCheckpointStore, PostgresEventStore,
};
use projections::{InMemoryReadModelStore, PostgresReadModelStore, ReadModelStore};
use saga::{InMemoryOutcomeStore, OutcomeStore, PostgresOutcomeStore, SagaConfig};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S, C, R>(store: S, checkpoints: C, views: R, outcomes: Arc<dyn OutcomeStore>, config: Config)
where
    S: EventStore + Clone + 'static,
    C: CheckpointStore + 'static,
    R: ReadModelStore + Clone + 'static,
{
    // Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let (state, projector) = api::create_state(store, checkpoints, views, outcomes, SagaConfig::default());

    // Bring the read model up to date, then tail the feed in the background.
    projector.catch_up().await.expect("projector catch-up failed");
    let projector_task = tokio::spawn(async move {
        if let Err(e) = projector.run(std::future::pending::<()>()).await {
            tracing::error!(error = %e, "projector stopped");
        }
    });

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    projector_task.abort();
    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to database");

            let store = PostgresEventStore::new(pool.clone());
            store.run_migrations().await.expect("migrations failed");

            serve(
                store,
                PostgresCheckpointStore::new(pool.clone()),
                PostgresReadModelStore::new(pool.clone()),
                Arc::new(PostgresOutcomeStore::new(pool)),
                config,
            )
            .await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running on the in-memory event store");
            serve(
                InMemoryEventStore::new(),
                InMemoryCheckpointStore::new(),
                InMemoryReadModelStore::new(),
                Arc::new(InMemoryOutcomeStore::new()),
                config,
            )
            .await;
        }
    }
}
