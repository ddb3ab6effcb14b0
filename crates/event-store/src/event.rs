use chrono::{DateTime, Utc};
use common::StreamId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of an event within its stream.
///
/// Versions are contiguous starting at 1. An aggregate that has seen no
/// events sits at [`Version::initial`] (0), and the first append claims
/// [`Version::first`]. The slot an event claims is what the store's
/// uniqueness constraint fences.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a stream with no events yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version of the first event on a stream.
    pub fn first() -> Self {
        Self(1)
    }

    /// The version directly after this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// The closed set of event types the system records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Stock replenished on a product stream.
    StockAdded,
    /// Stock reserved for an order.
    StockReserved,
    /// A reservation returned to stock (compensation).
    StockReleased,
    /// A charge was accepted for an order.
    PaymentProcessed,
    /// A charge was declined for an order.
    PaymentFailed,
}

impl EventKind {
    /// Stable name used in storage and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::StockAdded => "StockAdded",
            EventKind::StockReserved => "StockReserved",
            EventKind::StockReleased => "StockReleased",
            EventKind::PaymentProcessed => "PaymentProcessed",
            EventKind::PaymentFailed => "PaymentFailed",
        }
    }

    /// Parses the stable name back into a kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "StockAdded" => Some(EventKind::StockAdded),
            "StockReserved" => Some(EventKind::StockReserved),
            "StockReleased" => Some(EventKind::StockReleased),
            "PaymentProcessed" => Some(EventKind::PaymentProcessed),
            "PaymentFailed" => Some(EventKind::PaymentFailed),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable entry in the append-only log.
///
/// `amount` carries a quantity for stock events and a cent amount for
/// payment events. Events are never mutated or deleted once committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier of this event.
    pub event_id: Uuid,

    /// The stream this event belongs to.
    pub stream_id: StreamId,

    /// What happened.
    pub kind: EventKind,

    /// Quantity (stock events) or cent amount (payment events).
    pub amount: i64,

    /// The stream-scoped version slot this event claims.
    pub version: Version,

    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,

    /// Idempotency key of the saga step that produced this event, if any.
    ///
    /// An append whose key is already present on the stream is treated as
    /// a no-op success, so a step retried after a lost confirmation does
    /// not commit twice.
    pub dedup_key: Option<String>,
}

impl EventRecord {
    /// Creates an event claiming the given version slot, stamped now.
    pub fn new(stream_id: StreamId, kind: EventKind, amount: i64, version: Version) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            stream_id,
            kind,
            amount,
            version,
            timestamp: Utc::now(),
            dedup_key: None,
        }
    }

    /// Attaches a saga-step idempotency key.
    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;

    #[test]
    fn version_ordering_and_next() {
        assert_eq!(Version::initial().next(), Version::first());
        assert!(Version::first() < Version::new(2));
        assert_eq!(Version::new(5).next().as_i64(), 6);
    }

    #[test]
    fn kind_name_roundtrip() {
        for kind in [
            EventKind::StockAdded,
            EventKind::StockReserved,
            EventKind::StockReleased,
            EventKind::PaymentProcessed,
            EventKind::PaymentFailed,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("StockVanished"), None);
    }

    #[test]
    fn new_record_has_no_dedup_key() {
        let stream = StreamId::product(&ProductId::new("SKU-001"));
        let event = EventRecord::new(stream, EventKind::StockAdded, 10, Version::first());
        assert!(event.dedup_key.is_none());
        assert_eq!(event.amount, 10);
    }

    #[test]
    fn dedup_key_attaches() {
        let stream = StreamId::product(&ProductId::new("SKU-001"));
        let event = EventRecord::new(stream, EventKind::StockReserved, 3, Version::new(2))
            .with_dedup_key("reserve:ORD-1");
        assert_eq!(event.dedup_key.as_deref(), Some("reserve:ORD-1"));
    }

    #[test]
    fn record_serialization_roundtrip() {
        let stream = StreamId::product(&ProductId::new("SKU-001"));
        let event = EventRecord::new(stream, EventKind::StockReleased, 3, Version::new(4));
        let json = serde_json::to_string(&event).unwrap();
        let back: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_id, event.event_id);
        assert_eq!(back.kind, EventKind::StockReleased);
        assert_eq!(back.version, Version::new(4));
    }
}
