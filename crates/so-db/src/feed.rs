//! Row change feed
//!
//! [`ObservedStore`] wraps any store and publishes a [`RowEvent`] after every
//! successful single-row write. Subscribers (the `/api/changes` stream, a
//! [`LiveListing`]) only read; no write path consults the feed.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use so_core::traits::Id;
use so_models::Collection;
use tokio::sync::broadcast;

use crate::repository::{row_id, ListQuery, RecordStore, Row, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One committed row change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub id: Id,
    /// Row after the change; absent for deletes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<Row>,
}

/// Bounded broadcast channel of row events
///
/// Slow subscribers lose the oldest events instead of blocking writers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<RowEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RowEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: RowEvent) {
        // no subscribers is not an error
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Store decorator publishing row events
pub struct ObservedStore<S> {
    inner: S,
    feed: ChangeFeed,
}

impl<S: RecordStore> ObservedStore<S> {
    pub fn new(inner: S, feed: ChangeFeed) -> Self {
        Self { inner, feed }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for ObservedStore<S> {
    async fn list(&self, collection: Collection, query: ListQuery) -> StoreResult<Vec<Row>> {
        self.inner.list(collection, query).await
    }

    async fn get(&self, collection: Collection, id: Id) -> StoreResult<Row> {
        self.inner.get(collection, id).await
    }

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        let inserted = self.inner.insert(collection, rows).await?;
        for row in &inserted {
            if let Ok(id) = row_id(row) {
                self.feed.publish(RowEvent {
                    collection,
                    kind: ChangeKind::Insert,
                    id,
                    row: Some(row.clone()),
                });
            }
        }
        Ok(inserted)
    }

    async fn update(&self, collection: Collection, id: Id, patch: Row) -> StoreResult<Row> {
        let updated = self.inner.update(collection, id, patch).await?;
        self.feed.publish(RowEvent {
            collection,
            kind: ChangeKind::Update,
            id,
            row: Some(updated.clone()),
        });
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: Id) -> StoreResult<()> {
        self.inner.delete(collection, id).await?;
        self.feed.publish(RowEvent {
            collection,
            kind: ChangeKind::Delete,
            id,
            row: None,
        });
        Ok(())
    }

    async fn delete_where(
        &self,
        collection: Collection,
        column: &str,
        value: Id,
    ) -> StoreResult<u64> {
        self.inner.delete_where(collection, column, value).await
    }

    async fn order_aggregate(&self, id: Id) -> StoreResult<Row> {
        self.inner.order_aggregate(id).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

/// Listing kept current by folding row events, newest first
#[derive(Debug, Clone)]
pub struct LiveListing {
    collection: Collection,
    rows: Vec<Row>,
}

impl LiveListing {
    /// Start from a snapshot already in display order
    pub fn new(collection: Collection, rows: Vec<Row>) -> Self {
        Self { collection, rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Fold one event; events for other collections are ignored
    pub fn apply(&mut self, event: &RowEvent) {
        if event.collection != self.collection {
            return;
        }
        let position = self
            .rows
            .iter()
            .position(|row| row.get("id").and_then(Value::as_i64) == Some(event.id));

        match (event.kind, position, &event.row) {
            (ChangeKind::Insert, None, Some(row)) => self.rows.insert(0, row.clone()),
            (ChangeKind::Insert, Some(index), Some(row))
            | (ChangeKind::Update, Some(index), Some(row)) => {
                self.rows[index].extend(row.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            (ChangeKind::Delete, Some(index), _) => {
                self.rows.remove(index);
            }
            _ => {}
        }
    }
}
