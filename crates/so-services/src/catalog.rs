//! Generic row service for the pick-list collections
//!
//! Team, materials, equipment, PPE and procedures share one create / patch /
//! delete flow; only the contract and the payload type differ.

use std::sync::Arc;

use serde::Serialize;
use so_contracts::{Contract, CreateRowContract, PatchRowContract};
use so_core::Id;
use so_db::{Collection, ListQuery, RecordStore, Row};
use so_models::RowPatch;
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::error::{to_row, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn RecordStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All rows, ascending by id
    pub async fn list(&self, collection: Collection) -> ServiceResult<Vec<Row>> {
        Ok(self.store.list(collection, ListQuery::by_id()).await?)
    }

    pub async fn get(&self, collection: Collection, id: Id) -> ServiceResult<Row> {
        Ok(self.store.get(collection, id).await?)
    }

    #[instrument(skip(self, payload))]
    pub async fn create<T>(&self, collection: Collection, payload: &T) -> ServiceResult<Row>
    where
        T: Validate + Serialize + Sync,
    {
        CreateRowContract.validate(payload).map_err(|errors| {
            debug!(errors = %errors, "row rejected");
            ServiceError::Validation(errors)
        })?;

        let row = self.store.insert_one(collection, to_row(payload)?).await?;
        info!(collection = %collection, id = ?row.get("id"), "row created");
        Ok(row)
    }

    /// Apply `updatedData` to one row
    #[instrument(skip(self, patch), fields(id = patch.id))]
    pub async fn patch(&self, collection: Collection, patch: RowPatch) -> ServiceResult<Row> {
        PatchRowContract::new(collection)
            .validate(&patch)
            .map_err(|errors| {
                debug!(errors = %errors, "row update rejected");
                ServiceError::Validation(errors)
            })?;

        let row = self.store.update(collection, patch.id, patch.data).await?;
        info!(collection = %collection, id = patch.id, "row updated");
        Ok(row)
    }

    /// Delete one row after checking it exists; returns the deleted id
    #[instrument(skip(self))]
    pub async fn delete(&self, collection: Collection, id: Id) -> ServiceResult<Id> {
        if !self.store.exists(collection, id).await? {
            return Err(ServiceError::NotFound {
                entity: collection.label(),
                id,
            });
        }
        self.store.delete(collection, id).await?;
        info!(collection = %collection, id, "row deleted");
        Ok(id)
    }
}
