//! Order acceptance gate.

use common::ProductId;
use projections::{ProjectionError, ReadModelStore};

/// Verdict of the soft check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The view has enough stock; start the saga.
    Accepted,
    /// The view says there is not enough stock; fail fast with the count
    /// the client saw.
    Rejected { available: i64 },
}

/// Fast, explicitly non-authoritative admission check.
///
/// Reads the (possibly lagging) product view and rejects requests it
/// cannot possibly satisfy. Because the view trails the log this can
/// both false-accept and false-reject; it exists for fail-fast UX only.
/// The authoritative check is the one the reservation handler performs
/// at append time.
pub struct AcceptanceGate<R: ReadModelStore> {
    views: R,
}

impl<R: ReadModelStore> AcceptanceGate<R> {
    /// Creates a gate over the given view store.
    pub fn new(views: R) -> Self {
        Self { views }
    }

    /// Checks a request against the current view.
    ///
    /// A product with no row counts as zero stock: an unseeded product
    /// cannot be ordered until the projector has folded its first event.
    pub async fn admit(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<GateDecision, ProjectionError> {
        let available = self
            .views
            .get(product_id)
            .await?
            .map(|view| view.available)
            .unwrap_or(0);

        if available < quantity {
            metrics::counter!("gate_rejections_total").increment(1);
            tracing::info!(%product_id, available, requested = quantity, "soft check rejected order");
            return Ok(GateDecision::Rejected { available });
        }

        metrics::counter!("gate_admissions_total").increment(1);
        Ok(GateDecision::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::Version;
    use projections::{InMemoryReadModelStore, ProductView};

    async fn gate_with_stock(available: i64) -> AcceptanceGate<InMemoryReadModelStore> {
        let views = InMemoryReadModelStore::new();
        views
            .insert_new(ProductView {
                product_id: ProductId::new("SKU-001"),
                available,
                last_applied_version: Version::first(),
            })
            .await
            .unwrap();
        AcceptanceGate::new(views)
    }

    #[tokio::test]
    async fn admits_when_the_view_has_stock() {
        let gate = gate_with_stock(10).await;
        let decision = gate.admit(&ProductId::new("SKU-001"), 3).await.unwrap();
        assert_eq!(decision, GateDecision::Accepted);
    }

    #[tokio::test]
    async fn rejects_with_the_stale_count() {
        let gate = gate_with_stock(2).await;
        let decision = gate.admit(&ProductId::new("SKU-001"), 5).await.unwrap();
        assert_eq!(decision, GateDecision::Rejected { available: 2 });
    }

    #[tokio::test]
    async fn unknown_product_counts_as_zero() {
        let gate = AcceptanceGate::new(InMemoryReadModelStore::new());
        let decision = gate.admit(&ProductId::new("SKU-404"), 1).await.unwrap();
        assert_eq!(decision, GateDecision::Rejected { available: 0 });
    }
}
