//! Service seams between the coordinator and the subsystems it drives.
//!
//! The coordinator only knows these traits and the [`StepError`]
//! classification they return; the adapter impls below map the real
//! handlers' error types onto that classification.

use async_trait::async_trait;
use common::{OrderId, ProductId};
use event_store::EventStore;
use inventory::{InventoryError, InventoryHandler};
use payment::{PaymentError, PaymentProcessor};

use crate::engine::StepError;

/// Inventory operations the saga invokes.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Reserves stock for an order.
    async fn reserve(
        &self,
        product_id: &ProductId,
        quantity: i64,
        dedup_key: &str,
    ) -> Result<(), StepError>;

    /// Releases a previous reservation (compensation).
    async fn release(
        &self,
        product_id: &ProductId,
        quantity: i64,
        dedup_key: &str,
    ) -> Result<(), StepError>;
}

/// Payment operations the saga invokes.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges an order.
    async fn charge(
        &self,
        order_id: &OrderId,
        amount: i64,
        dedup_key: &str,
    ) -> Result<(), StepError>;
}

fn classify_inventory(err: InventoryError) -> StepError {
    if err.is_retryable() {
        StepError::Transient(err.to_string())
    } else {
        StepError::Terminal(err.to_string())
    }
}

fn classify_payment(err: PaymentError) -> StepError {
    if err.is_retryable() {
        StepError::Transient(err.to_string())
    } else {
        StepError::Terminal(err.to_string())
    }
}

#[async_trait]
impl<S: EventStore> InventoryService for InventoryHandler<S> {
    async fn reserve(
        &self,
        product_id: &ProductId,
        quantity: i64,
        dedup_key: &str,
    ) -> Result<(), StepError> {
        InventoryHandler::reserve(self, product_id, quantity, Some(dedup_key))
            .await
            .map(|_| ())
            .map_err(classify_inventory)
    }

    async fn release(
        &self,
        product_id: &ProductId,
        quantity: i64,
        dedup_key: &str,
    ) -> Result<(), StepError> {
        InventoryHandler::release(self, product_id, quantity, Some(dedup_key))
            .await
            .map(|_| ())
            .map_err(classify_inventory)
    }
}

#[async_trait]
impl<S: EventStore> PaymentService for PaymentProcessor<S> {
    async fn charge(
        &self,
        order_id: &OrderId,
        amount: i64,
        dedup_key: &str,
    ) -> Result<(), StepError> {
        PaymentProcessor::charge(self, order_id, amount, Some(dedup_key))
            .await
            .map(|_| ())
            .map_err(classify_payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;
    use payment::PaymentConfig;

    #[tokio::test]
    async fn insufficient_stock_maps_to_terminal() {
        let store = InMemoryEventStore::new();
        let handler = InventoryHandler::new(store);
        let product = ProductId::new("SKU-001");

        let result = InventoryService::reserve(&handler, &product, 5, "reserve:ORD-1").await;
        assert!(matches!(result, Err(StepError::Terminal(_))));
    }

    #[tokio::test]
    async fn payment_rejection_maps_to_terminal() {
        let store = InMemoryEventStore::new();
        let processor = PaymentProcessor::new(store, PaymentConfig::default());
        let order = OrderId::new("ORD-1");

        let result = PaymentService::charge(&processor, &order, 15_000, "charge:ORD-1").await;
        assert!(matches!(result, Err(StepError::Terminal(_))));
    }

    #[tokio::test]
    async fn successful_operations_map_to_ok() {
        let store = InMemoryEventStore::new();
        let handler = InventoryHandler::new(store.clone());
        let processor = PaymentProcessor::new(store, PaymentConfig::default());
        let product = ProductId::new("SKU-001");
        let order = OrderId::new("ORD-1");

        handler.add_stock(&product, 10, None).await.unwrap();

        assert!(
            InventoryService::reserve(&handler, &product, 3, "reserve:ORD-1")
                .await
                .is_ok()
        );
        assert!(
            InventoryService::release(&handler, &product, 3, "release:ORD-1")
                .await
                .is_ok()
        );
        assert!(
            PaymentService::charge(&processor, &order, 500, "charge:ORD-1")
                .await
                .is_ok()
        );
    }
}
