use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use common::StreamId;
use futures_util::stream;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Cursor, EventKind, EventRecord, EventStoreError, Result, Version,
    store::{CheckpointStore, EventFeed, EventStore},
};

const FEED_BATCH: usize = 256;

/// PostgreSQL-backed event log.
///
/// The global cursor is the `seq` bigserial of the `events` table; the
/// `(stream_id, version)` unique constraint is the OCC fence and the
/// partial unique index on `(stream_id, dedup_key)` is the idempotency
/// fence. The live feed is a polling tail over `seq`.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
    poll_interval: Duration,
}

impl PostgresEventStore {
    /// Creates a store on an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            poll_interval: Duration::from_millis(200),
        }
    }

    /// Overrides how often an idle feed re-polls the log.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: &PgRow) -> Result<EventRecord> {
        let kind_name: String = row.try_get("kind")?;
        let kind = EventKind::parse(&kind_name).ok_or_else(|| {
            EventStoreError::CorruptRow(format!("unknown event kind '{kind_name}'"))
        })?;

        Ok(EventRecord {
            event_id: row.try_get::<Uuid, _>("event_id")?,
            stream_id: StreamId::new(row.try_get::<String, _>("stream_id")?),
            kind,
            amount: row.try_get("amount")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            dedup_key: row.try_get("dedup_key")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: EventRecord) -> Result<Version> {
        let mut tx = self.pool.begin().await?;

        if let Some(key) = &event.dedup_key {
            let existing: Option<i64> =
                sqlx::query_scalar("SELECT version FROM events WHERE stream_id = $1 AND dedup_key = $2")
                    .bind(event.stream_id.as_str())
                    .bind(key)
                    .fetch_optional(&mut *tx)
                    .await?;

            if let Some(version) = existing {
                metrics::counter!("store_appends_deduped_total").increment(1);
                return Ok(Version::new(version));
            }
        }

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE stream_id = $1")
                .bind(event.stream_id.as_str())
                .fetch_one(&mut *tx)
                .await?;
        let current = Version::new(current.unwrap_or(0));

        if event.version <= current {
            metrics::counter!("store_append_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id: event.stream_id,
                version: event.version,
            });
        }
        if event.version != current.next() {
            return Err(EventStoreError::VersionGap {
                stream_id: event.stream_id,
                version: event.version,
                expected: current.next(),
            });
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO events (event_id, stream_id, kind, amount, version, timestamp, dedup_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.event_id)
        .bind(event.stream_id.as_str())
        .bind(event.kind.as_str())
        .bind(event.amount)
        .bind(event.version.as_i64())
        .bind(event.timestamp)
        .bind(&event.dedup_key)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                metrics::counter!("store_appends_total").increment(1);
                Ok(event.version)
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("unique_stream_version") =>
            {
                // Another writer claimed the slot between our read and insert.
                metrics::counter!("store_append_conflicts_total").increment(1);
                Err(EventStoreError::ConcurrencyConflict {
                    stream_id: event.stream_id,
                    version: event.version,
                })
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("unique_stream_dedup") =>
            {
                // Lost a dedup race; the other writer's commit is our success.
                drop(tx);
                let version: i64 = sqlx::query_scalar(
                    "SELECT version FROM events WHERE stream_id = $1 AND dedup_key = $2",
                )
                .bind(event.stream_id.as_str())
                .bind(&event.dedup_key)
                .fetch_one(&self.pool)
                .await?;
                metrics::counter!("store_appends_deduped_total").increment(1);
                Ok(Version::new(version))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_stream(&self, stream_id: &StreamId) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, stream_id, kind, amount, version, timestamp, dedup_key
            FROM events
            WHERE stream_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(stream_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn read_since(
        &self,
        after: Option<Cursor>,
        limit: usize,
    ) -> Result<Vec<(Cursor, EventRecord)>> {
        let after = after.map(|c| c.as_i64()).unwrap_or(0);
        let rows = sqlx::query(
            r#"
            SELECT seq, event_id, stream_id, kind, amount, version, timestamp, dedup_key
            FROM events
            WHERE seq > $1
            ORDER BY seq ASC
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let seq: i64 = row.try_get("seq")?;
                Ok((Cursor::new(seq), Self::row_to_event(row)?))
            })
            .collect()
    }

    async fn subscribe(&self, after: Option<Cursor>) -> Result<EventFeed> {
        let store = self.clone();
        let buf: VecDeque<(Cursor, EventRecord)> = VecDeque::new();

        let feed = stream::unfold((store, after, buf), |(store, mut after, mut buf)| async move {
            loop {
                if let Some(item) = buf.pop_front() {
                    return Some((Ok(item), (store, after, buf)));
                }
                match store.read_since(after, FEED_BATCH).await {
                    Ok(batch) if batch.is_empty() => {
                        tokio::time::sleep(store.poll_interval).await;
                    }
                    Ok(batch) => {
                        after = batch.last().map(|(cursor, _)| *cursor);
                        buf.extend(batch);
                    }
                    Err(e) => return Some((Err(e), (store, after, buf))),
                }
            }
        });

        Ok(Box::pin(feed))
    }

    async fn latest_version(&self, stream_id: &StreamId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(version.map(Version::new))
    }
}

/// PostgreSQL-backed checkpoint storage.
#[derive(Clone)]
pub struct PostgresCheckpointStore {
    pool: PgPool,
}

impl PostgresCheckpointStore {
    /// Creates a checkpoint store on an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for PostgresCheckpointStore {
    async fn get(&self, projector_id: &str) -> Result<Option<Cursor>> {
        let cursor: Option<i64> =
            sqlx::query_scalar("SELECT cursor FROM checkpoints WHERE projector_id = $1")
                .bind(projector_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(cursor.map(Cursor::new))
    }

    async fn set(&self, projector_id: &str, cursor: Cursor) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO checkpoints (projector_id, cursor)
            VALUES ($1, $2)
            ON CONFLICT (projector_id) DO UPDATE SET cursor = EXCLUDED.cursor
            "#,
        )
        .bind(projector_id)
        .bind(cursor.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
