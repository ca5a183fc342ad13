//! Shared fixtures for service tests

use std::sync::Arc;

use async_trait::async_trait;
use so_core::Id;
use so_db::testing::{seed, seeded_memory_store};
use so_db::{Collection, ListQuery, MemoryRecordStore, RecordStore, Row, StoreError, StoreResult};

pub async fn seeded_store() -> Arc<dyn RecordStore> {
    Arc::new(seeded_memory_store().await.unwrap())
}

/// Store whose inserts into one collection always fail
pub struct FailingStore {
    inner: MemoryRecordStore,
    failing: Collection,
}

impl FailingStore {
    pub async fn seeded(failing: Collection) -> Arc<Self> {
        let inner = MemoryRecordStore::new();
        seed(&inner).await.unwrap();
        Arc::new(Self { inner, failing })
    }

    pub fn inner(&self) -> &MemoryRecordStore {
        &self.inner
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn list(&self, collection: Collection, query: ListQuery) -> StoreResult<Vec<Row>> {
        self.inner.list(collection, query).await
    }

    async fn get(&self, collection: Collection, id: Id) -> StoreResult<Row> {
        self.inner.get(collection, id).await
    }

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> StoreResult<Vec<Row>> {
        if collection == self.failing {
            return Err(StoreError::Constraint(format!("{} insert rejected", collection)));
        }
        self.inner.insert(collection, rows).await
    }

    async fn update(&self, collection: Collection, id: Id, patch: Row) -> StoreResult<Row> {
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: Collection, id: Id) -> StoreResult<()> {
        self.inner.delete(collection, id).await
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
        Ok(())
    }
}
