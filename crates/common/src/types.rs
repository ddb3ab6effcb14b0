use serde::{Deserialize, Serialize};

/// Identifier of a product in the catalog.
///
/// Products are addressed by a natural key (e.g. `"SKU-001"`), not a
/// surrogate id, so this wraps the string the client supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a product id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a customer order.
///
/// Supplied by the client on submission; also used to derive the payment
/// stream and the idempotency keys of the order's saga steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Key of one event stream in the append-only log.
///
/// Product streams and payment streams share a single log, so the key is
/// namespaced to keep an order id from ever colliding with a product id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Creates a stream id from a raw string (used when reading rows back).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the stream holding a product's stock events.
    pub fn product(id: &ProductId) -> Self {
        Self(format!("product/{id}"))
    }

    /// Returns the stream holding an order's payment events.
    pub fn payment(id: &OrderId) -> Self {
        Self(format!("payment/{id}"))
    }

    /// Returns the product id if this is a product stream.
    pub fn product_id(&self) -> Option<ProductId> {
        self.0.strip_prefix("product/").map(ProductId::new)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
