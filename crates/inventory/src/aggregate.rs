use common::ProductId;
use event_store::{EventKind, EventRecord, Version};

/// Current stock position of one product.
///
/// Transient and never persisted: rebuilt on demand by replaying the
/// product's stream in version order. The fold is pure, so replaying the
/// same prefix always yields the same `(on_hand, last_version)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    product_id: ProductId,
    on_hand: i64,
    last_version: Version,
}

impl StockLevel {
    /// An empty position for a product with no events yet.
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            on_hand: 0,
            last_version: Version::initial(),
        }
    }

    /// Folds one event into the position.
    ///
    /// The version always advances, even for kinds that do not change the
    /// quantity, so the next append still targets a contiguous slot.
    pub fn apply(&mut self, event: &EventRecord) {
        match event.kind {
            EventKind::StockAdded | EventKind::StockReleased => self.on_hand += event.amount,
            EventKind::StockReserved => self.on_hand -= event.amount,
            EventKind::PaymentProcessed | EventKind::PaymentFailed => {}
        }
        self.last_version = event.version;
    }

    /// Folds a sequence of events, oldest first.
    pub fn replay<'a>(&mut self, events: impl IntoIterator<Item = &'a EventRecord>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Rebuilds the position from a full stream read.
    pub fn rebuild(product_id: ProductId, events: &[EventRecord]) -> Self {
        let mut level = Self::new(product_id);
        level.replay(events);
        level
    }

    /// The product this position belongs to.
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Units currently on hand (signed; reservations subtract).
    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    /// Version of the last folded event.
    pub fn last_version(&self) -> Version {
        self.last_version
    }

    /// The version slot a new append must claim.
    pub fn next_version(&self) -> Version {
        self.last_version.next()
    }
}
