use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use event_store::Version;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{ProjectionError, Result};

/// One row of the product availability view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub product_id: ProductId,
    /// Units available according to the (possibly lagging) fold.
    pub available: i64,
    /// Version of the last stream event folded into this row.
    ///
    /// Monotonically non-decreasing; the projector skips any event at or
    /// below it, which is what makes redelivery harmless.
    pub last_applied_version: Version,
}

/// How an insert of a new row ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another writer created the row first; a benign race.
    AlreadyExists,
}

/// Storage for the product availability view.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    /// Returns a product's row, if one exists.
    async fn get(&self, product_id: &ProductId) -> Result<Option<ProductView>>;

    /// Inserts a brand-new row; reports an existing row instead of
    /// failing, so racing writers can treat it as already done.
    async fn insert_new(&self, view: ProductView) -> Result<InsertOutcome>;

    /// Adds `delta` to a row's availability and advances its version.
    async fn apply(&self, product_id: &ProductId, delta: i64, version: Version) -> Result<()>;

    /// Returns all rows (diagnostics).
    async fn all(&self) -> Result<Vec<ProductView>>;
}

#[async_trait]
impl<T: ReadModelStore + ?Sized> ReadModelStore for Arc<T> {
    async fn get(&self, product_id: &ProductId) -> Result<Option<ProductView>> {
        (**self).get(product_id).await
    }

    async fn insert_new(&self, view: ProductView) -> Result<InsertOutcome> {
        (**self).insert_new(view).await
    }

    async fn apply(&self, product_id: &ProductId, delta: i64, version: Version) -> Result<()> {
        (**self).apply(product_id, delta, version).await
    }

    async fn all(&self) -> Result<Vec<ProductView>> {
        (**self).all().await
    }
}

/// In-memory view storage.
#[derive(Clone, Default)]
pub struct InMemoryReadModelStore {
    rows: Arc<RwLock<HashMap<ProductId, ProductView>>>,
}

impl InMemoryReadModelStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadModelStore for InMemoryReadModelStore {
    async fn get(&self, product_id: &ProductId) -> Result<Option<ProductView>> {
        Ok(self.rows.read().await.get(product_id).cloned())
    }

    async fn insert_new(&self, view: ProductView) -> Result<InsertOutcome> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&view.product_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.insert(view.product_id.clone(), view);
        Ok(InsertOutcome::Inserted)
    }

    async fn apply(&self, product_id: &ProductId, delta: i64, version: Version) -> Result<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(product_id)
            .ok_or_else(|| ProjectionError::RowNotFound {
                product_id: product_id.clone(),
            })?;
        row.available += delta;
        row.last_applied_version = version;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<ProductView>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(product: &str, available: i64, version: i64) -> ProductView {
        ProductView {
            product_id: ProductId::new(product),
            available,
            last_applied_version: Version::new(version),
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = InMemoryReadModelStore::new();

        let outcome = store.insert_new(row("SKU-001", 10, 1)).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        let view = store.get(&ProductId::new("SKU-001")).await.unwrap().unwrap();
        assert_eq!(view.available, 10);
        assert_eq!(view.last_applied_version, Version::new(1));
    }

    #[tokio::test]
    async fn duplicate_insert_is_reported_not_failed() {
        let store = InMemoryReadModelStore::new();

        store.insert_new(row("SKU-001", 10, 1)).await.unwrap();
        let outcome = store.insert_new(row("SKU-001", 99, 5)).await.unwrap();

        assert_eq!(outcome, InsertOutcome::AlreadyExists);
        // The original row is untouched.
        let view = store.get(&ProductId::new("SKU-001")).await.unwrap().unwrap();
        assert_eq!(view.available, 10);
    }

    #[tokio::test]
    async fn apply_adjusts_and_advances() {
        let store = InMemoryReadModelStore::new();
        store.insert_new(row("SKU-001", 10, 1)).await.unwrap();

        store
            .apply(&ProductId::new("SKU-001"), -3, Version::new(2))
            .await
            .unwrap();

        let view = store.get(&ProductId::new("SKU-001")).await.unwrap().unwrap();
        assert_eq!(view.available, 7);
        assert_eq!(view.last_applied_version, Version::new(2));
    }

    #[tokio::test]
    async fn apply_to_missing_row_errors() {
        let store = InMemoryReadModelStore::new();
        let result = store
            .apply(&ProductId::new("SKU-404"), 1, Version::new(1))
            .await;
        assert!(matches!(result, Err(ProjectionError::RowNotFound { .. })));
    }
}
