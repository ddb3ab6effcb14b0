use common::{OrderId, StreamId};
use event_store::{EventKind, EventRecord, EventStore, Version};

use crate::error::{PaymentError, Result};

/// Payment tuning passed at composition time.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Charges strictly above this cent amount are declined.
    pub decline_over: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            decline_over: 10_000,
        }
    }
}

/// Applies payment decisions and records them on the order's stream.
///
/// Stands in for a real gateway: the decision is a deterministic amount
/// threshold, so a retried charge reaches the same verdict it reached the
/// first time.
#[derive(Clone)]
pub struct PaymentProcessor<S: EventStore> {
    store: S,
    config: PaymentConfig,
}

impl<S: EventStore> PaymentProcessor<S> {
    /// Creates a processor over the given event store.
    pub fn new(store: S, config: PaymentConfig) -> Self {
        Self { store, config }
    }

    /// Charges an order.
    ///
    /// The decision is recorded before it is answered: a declined charge
    /// appends `PaymentFailed` and then returns
    /// [`PaymentError::Rejected`]; an accepted one appends
    /// `PaymentProcessed` and returns its version.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn charge(
        &self,
        order_id: &OrderId,
        amount: i64,
        dedup_key: Option<&str>,
    ) -> Result<Version> {
        if amount <= 0 {
            return Err(PaymentError::InvalidAmount { amount });
        }

        let stream = StreamId::payment(order_id);
        let last = self
            .store
            .latest_version(&stream)
            .await?
            .unwrap_or(Version::initial());

        if amount > self.config.decline_over {
            self.record(stream, EventKind::PaymentFailed, amount, last.next(), dedup_key)
                .await?;
            metrics::counter!("payments_rejected_total").increment(1);
            tracing::info!(amount, limit = self.config.decline_over, "charge declined");
            return Err(PaymentError::Rejected {
                order_id: order_id.clone(),
                amount,
            });
        }

        let version = self
            .record(stream, EventKind::PaymentProcessed, amount, last.next(), dedup_key)
            .await?;
        metrics::counter!("payments_processed_total").increment(1);
        Ok(version)
    }

    async fn record(
        &self,
        stream: StreamId,
        kind: EventKind,
        amount: i64,
        version: Version,
        dedup_key: Option<&str>,
    ) -> Result<Version> {
        let mut event = EventRecord::new(stream, kind, amount, version);
        if let Some(key) = dedup_key {
            event = event.with_dedup_key(key);
        }
        Ok(self.store.append(event).await?)
    }
}
