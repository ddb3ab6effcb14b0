use common::{ProductId, StreamId};
use event_store::{EventKind, EventRecord, EventStore, Version};

use crate::aggregate::StockLevel;
use crate::error::{InventoryError, Result};

/// Command handlers for the inventory aggregate.
///
/// Each command is one optimistic pass: load the stream, fold it, check,
/// append at the next version. No lock is held across the sequence; a
/// writer that loses the version slot gets a retryable conflict and the
/// caller repeats the whole pass against fresh state.
#[derive(Clone)]
pub struct InventoryHandler<S: EventStore> {
    store: S,
}

impl<S: EventStore> InventoryHandler<S> {
    /// Creates a handler over the given event store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the current stock position of a product.
    pub async fn stock_level(&self, product_id: &ProductId) -> Result<StockLevel> {
        let stream = StreamId::product(product_id);
        let events = self.store.read_stream(&stream).await?;
        Ok(StockLevel::rebuild(product_id.clone(), &events))
    }

    /// Reserves `quantity` units for an order.
    ///
    /// Fails with [`InventoryError::InsufficientStock`] when the freshly
    /// folded position cannot cover the request; this is the authoritative
    /// check, performed at append time against the version the append will
    /// be fenced on.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn reserve(
        &self,
        product_id: &ProductId,
        quantity: i64,
        dedup_key: Option<&str>,
    ) -> Result<Version> {
        check_quantity(quantity)?;
        let level = self.stock_level(product_id).await?;

        if level.on_hand() < quantity {
            metrics::counter!("inventory_insufficient_total").increment(1);
            tracing::info!(
                available = level.on_hand(),
                requested = quantity,
                "reservation refused"
            );
            return Err(InventoryError::InsufficientStock {
                product_id: product_id.clone(),
                available: level.on_hand(),
                requested: quantity,
            });
        }

        let version = self
            .append(
                product_id,
                EventKind::StockReserved,
                quantity,
                level.next_version(),
                dedup_key,
            )
            .await?;
        metrics::counter!("inventory_reservations_total").increment(1);
        Ok(version)
    }

    /// Returns `quantity` units to stock.
    ///
    /// Crediting is always legal, so no sufficiency check: this is the
    /// compensation path and must not be able to fail on business grounds.
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn release(
        &self,
        product_id: &ProductId,
        quantity: i64,
        dedup_key: Option<&str>,
    ) -> Result<Version> {
        check_quantity(quantity)?;
        let level = self.stock_level(product_id).await?;

        let version = self
            .append(
                product_id,
                EventKind::StockReleased,
                quantity,
                level.next_version(),
                dedup_key,
            )
            .await?;
        metrics::counter!("inventory_releases_total").increment(1);
        Ok(version)
    }

    /// Replenishes stock (operator/seeding path).
    #[tracing::instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_stock(
        &self,
        product_id: &ProductId,
        quantity: i64,
        dedup_key: Option<&str>,
    ) -> Result<Version> {
        check_quantity(quantity)?;
        let level = self.stock_level(product_id).await?;

        self.append(
            product_id,
            EventKind::StockAdded,
            quantity,
            level.next_version(),
            dedup_key,
        )
        .await
    }

    async fn append(
        &self,
        product_id: &ProductId,
        kind: EventKind,
        quantity: i64,
        version: Version,
        dedup_key: Option<&str>,
    ) -> Result<Version> {
        let mut event = EventRecord::new(StreamId::product(product_id), kind, quantity, version);
        if let Some(key) = dedup_key {
            event = event.with_dedup_key(key);
        }
        Ok(self.store.append(event).await?)
    }
}

fn check_quantity(quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(InventoryError::InvalidQuantity { quantity });
    }
    Ok(())
}
