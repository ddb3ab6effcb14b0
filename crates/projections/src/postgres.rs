use async_trait::async_trait;
use common::ProductId;
use event_store::{EventStoreError, Version};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{ProjectionError, Result};
use crate::read_model::{InsertOutcome, ProductView, ReadModelStore};

/// PostgreSQL-backed view storage.
#[derive(Clone)]
pub struct PostgresReadModelStore {
    pool: PgPool,
}

impl PostgresReadModelStore {
    /// Creates a store on an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_view(row: &PgRow) -> Result<ProductView> {
        Ok(ProductView {
            product_id: ProductId::new(
                row.try_get::<String, _>("product_id")
                    .map_err(EventStoreError::from)?,
            ),
            available: row.try_get("available").map_err(EventStoreError::from)?,
            last_applied_version: Version::new(
                row.try_get("last_applied_version")
                    .map_err(EventStoreError::from)?,
            ),
        })
    }
}

#[async_trait]
impl ReadModelStore for PostgresReadModelStore {
    async fn get(&self, product_id: &ProductId) -> Result<Option<ProductView>> {
        let row = sqlx::query(
            "SELECT product_id, available, last_applied_version FROM product_view WHERE product_id = $1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(EventStoreError::from)?;

        row.as_ref().map(Self::row_to_view).transpose()
    }

    async fn insert_new(&self, view: ProductView) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_view (product_id, available, last_applied_version)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id) DO NOTHING
            "#,
        )
        .bind(view.product_id.as_str())
        .bind(view.available)
        .bind(view.last_applied_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(EventStoreError::from)?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn apply(&self, product_id: &ProductId, delta: i64, version: Version) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE product_view
            SET available = available + $2, last_applied_version = $3
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_str())
        .bind(delta)
        .bind(version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(EventStoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(ProjectionError::RowNotFound {
                product_id: product_id.clone(),
            });
        }
        Ok(())
    }

    async fn all(&self) -> Result<Vec<ProductView>> {
        let rows =
            sqlx::query("SELECT product_id, available, last_applied_version FROM product_view")
                .fetch_all(&self.pool)
                .await
                .map_err(EventStoreError::from)?;

        rows.iter().map(Self::row_to_view).collect()
    }
}
