use std::future::Future;

use event_store::{CheckpointStore, EventKind, EventRecord, EventStore};
use futures_util::StreamExt;

use crate::error::Result;
use crate::read_model::{InsertOutcome, ProductView, ReadModelStore};

const CATCH_UP_BATCH: usize = 256;

/// Identity and tuning for one projector instance.
#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// Checkpoint identity. One active consumer per id keeps the feed
    /// ordered; a second instance is tolerated but wasteful.
    pub projector_id: String,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            projector_id: "product-view".to_string(),
        }
    }
}

/// Tails the event log and folds stock events into the product view.
///
/// Per observed event: compute the signed delta, fold it into the row
/// behind the `last_applied_version` fence, then persist the feed cursor.
/// A failed fold is logged and counted but never stops the loop, and the
/// cursor advances regardless, trading completeness for availability.
pub struct Projector<S, C, R>
where
    S: EventStore,
    C: CheckpointStore,
    R: ReadModelStore,
{
    store: S,
    checkpoints: C,
    views: R,
    config: ProjectorConfig,
}

/// Signed effect of an event on availability; `None` for kinds the view
/// does not track.
fn stock_delta(event: &EventRecord) -> Option<i64> {
    match event.kind {
        EventKind::StockReserved => Some(-event.amount),
        EventKind::StockAdded | EventKind::StockReleased => Some(event.amount),
        EventKind::PaymentProcessed | EventKind::PaymentFailed => None,
    }
}

impl<S, C, R> Projector<S, C, R>
where
    S: EventStore,
    C: CheckpointStore,
    R: ReadModelStore,
{
    /// Creates a projector over the given stores.
    pub fn new(store: S, checkpoints: C, views: R, config: ProjectorConfig) -> Self {
        Self {
            store,
            checkpoints,
            views,
            config,
        }
    }

    /// Processes everything currently in the log, then returns.
    ///
    /// Starts from the persisted checkpoint, or from the beginning of the
    /// log when none exists: a fresh projector reconstructs the complete
    /// history rather than silently starting mid-stream.
    #[tracing::instrument(skip(self), fields(projector_id = %self.config.projector_id))]
    pub async fn catch_up(&self) -> Result<u64> {
        let mut cursor = self.checkpoints.get(&self.config.projector_id).await?;
        let mut processed = 0u64;

        loop {
            let batch = self.store.read_since(cursor, CATCH_UP_BATCH).await?;
            if batch.is_empty() {
                break;
            }
            for (position, event) in batch {
                self.observe(&event).await;
                self.save_checkpoint(position).await;
                cursor = Some(position);
                processed += 1;
            }
        }

        tracing::debug!(processed, "catch-up complete");
        Ok(processed)
    }

    /// Tails the live feed until `shutdown` resolves.
    #[tracing::instrument(skip(self, shutdown), fields(projector_id = %self.config.projector_id))]
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let cursor = self.checkpoints.get(&self.config.projector_id).await?;
        let mut feed = self.store.subscribe(cursor).await?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("projector shutting down");
                    return Ok(());
                }
                next = feed.next() => match next {
                    Some(Ok((position, event))) => {
                        self.observe(&event).await;
                        self.save_checkpoint(position).await;
                    }
                    Some(Err(e)) => {
                        // Feed hiccups are infra trouble, not data; keep
                        // tailing and let the store recover.
                        tracing::error!(error = %e, "change feed error");
                    }
                    None => {
                        tracing::info!("change feed ended");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Applies one observed event, absorbing its failure.
    async fn observe(&self, event: &EventRecord) {
        metrics::counter!("projector_events_observed_total").increment(1);
        if let Err(e) = self.apply_event(event).await {
            metrics::counter!("projector_events_failed_total").increment(1);
            tracing::error!(
                stream_id = %event.stream_id,
                version = %event.version,
                error = %e,
                "failed to project event"
            );
        }
    }

    async fn apply_event(&self, event: &EventRecord) -> Result<()> {
        let Some(delta) = stock_delta(event) else {
            return Ok(());
        };
        let Some(product_id) = event.stream_id.product_id() else {
            // A stock kind outside a product stream; nothing to fold.
            return Ok(());
        };

        match self.views.get(&product_id).await? {
            None => {
                let inserted = self
                    .views
                    .insert_new(ProductView {
                        product_id: product_id.clone(),
                        available: delta,
                        last_applied_version: event.version,
                    })
                    .await?;
                if inserted == InsertOutcome::AlreadyExists {
                    tracing::debug!(%product_id, "insert raced, row already present");
                }
            }
            Some(row) if event.version <= row.last_applied_version => {
                // Idempotence fence: redelivered or reordered event.
                metrics::counter!("projector_events_skipped_total").increment(1);
                tracing::debug!(
                    %product_id,
                    event_version = %event.version,
                    row_version = %row.last_applied_version,
                    "skipping already-applied event"
                );
            }
            Some(_) => {
                self.views.apply(&product_id, delta, event.version).await?;
            }
        }
        Ok(())
    }

    async fn save_checkpoint(&self, position: event_store::Cursor) {
        // Checkpoint trouble must not stall projection; a lost save only
        // means some redelivery after restart, which the fence absorbs.
        if let Err(e) = self.checkpoints.set(&self.config.projector_id, position).await {
            tracing::warn!(error = %e, "failed to save checkpoint");
        }
    }
}
