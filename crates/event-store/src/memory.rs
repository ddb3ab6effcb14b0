use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::StreamId;
use futures_util::stream;
use tokio::sync::{RwLock, watch};

use crate::{
    Cursor, EventRecord, EventStoreError, Result, Version,
    store::{CheckpointStore, EventFeed, EventStore},
};

struct StoreInner {
    log: RwLock<Vec<EventRecord>>,
    /// Latest appended sequence number; feed subscribers wait on changes.
    seq: watch::Sender<i64>,
}

/// In-memory event log used by tests and single-process deployments.
///
/// The global log is a vector; an event's cursor is its 1-based position.
/// Feeds are driven by a watch channel, so a subscriber sleeping at the
/// head of the log wakes as soon as any stream appends.
#[derive(Clone)]
pub struct InMemoryEventStore {
    inner: Arc<StoreInner>,
}

impl InMemoryEventStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        let (seq, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                log: RwLock::new(Vec::new()),
                seq,
            }),
        }
    }

    /// Returns the total number of events in the log.
    pub async fn event_count(&self) -> usize {
        self.inner.log.read().await.len()
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: EventRecord) -> Result<Version> {
        let version = event.version;
        let seq = {
            let mut log = self.inner.log.write().await;

            // Idempotent append: a step retried after a lost confirmation
            // finds its own key and observes success without writing.
            if let Some(key) = &event.dedup_key
                && let Some(existing) = log
                    .iter()
                    .find(|e| e.stream_id == event.stream_id && e.dedup_key.as_deref() == Some(key))
            {
                metrics::counter!("store_appends_deduped_total").increment(1);
                tracing::debug!(
                    stream_id = %event.stream_id,
                    dedup_key = %key,
                    version = %existing.version,
                    "append deduplicated"
                );
                return Ok(existing.version);
            }

            let current = log
                .iter()
                .filter(|e| e.stream_id == event.stream_id)
                .map(|e| e.version)
                .max()
                .unwrap_or(Version::initial());

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

            log.push(event);
            log.len() as i64
        };

        metrics::counter!("store_appends_total").increment(1);
        self.inner.seq.send_replace(seq);
        Ok(version)
    }

    async fn read_stream(&self, stream_id: &StreamId) -> Result<Vec<EventRecord>> {
        let log = self.inner.log.read().await;
        let mut events: Vec<_> = log
            .iter()
            .filter(|e| &e.stream_id == stream_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn read_since(
        &self,
        after: Option<Cursor>,
        limit: usize,
    ) -> Result<Vec<(Cursor, EventRecord)>> {
        let start = after.map(|c| c.as_i64()).unwrap_or(0).max(0) as usize;
        let log = self.inner.log.read().await;
        Ok(log
            .iter()
            .enumerate()
            .skip(start)
            .take(limit)
            .map(|(i, e)| (Cursor::new(i as i64 + 1), e.clone()))
            .collect())
    }

    async fn subscribe(&self, after: Option<Cursor>) -> Result<EventFeed> {
        let inner = self.inner.clone();
        let rx = self.inner.seq.subscribe();
        let next = after.map(|c| c.as_i64()).unwrap_or(0).max(0);

        let feed = stream::unfold((inner, rx, next), |(inner, mut rx, next)| async move {
            loop {
                {
                    let log = inner.log.read().await;
                    if (next as usize) < log.len() {
                        let event = log[next as usize].clone();
                        let cursor = Cursor::new(next + 1);
                        drop(log);
                        return Some((Ok((cursor, event)), (inner, rx, next + 1)));
                    }
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        });

        Ok(Box::pin(feed))
    }

    async fn latest_version(&self, stream_id: &StreamId) -> Result<Option<Version>> {
        let log = self.inner.log.read().await;
        Ok(log
            .iter()
            .filter(|e| &e.stream_id == stream_id)
            .map(|e| e.version)
            .max())
    }
}

/// In-memory checkpoint storage for feed consumers.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    cursors: Arc<RwLock<HashMap<String, Cursor>>>,
}

impl InMemoryCheckpointStore {
    /// Creates a new empty checkpoint store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, projector_id: &str) -> Result<Option<Cursor>> {
        Ok(self.cursors.read().await.get(projector_id).copied())
    }

    async fn set(&self, projector_id: &str, cursor: Cursor) -> Result<()> {
        self.cursors
            .write()
            .await
            .insert(projector_id.to_string(), cursor);
        Ok(())
    }
}
