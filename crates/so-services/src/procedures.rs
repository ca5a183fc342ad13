//! Procedure service
//!
//! A procedure and its bill of materials are written in two steps; when the
//! bill cannot be stored the procedure row is deleted again.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use so_contracts::{Contract, ProcedureContract};
use so_core::Id;
use so_db::{row_id, Collection, ListQuery, RecordStore, Row};
use so_models::{BomItem, Material, NewProcedure, Procedure, ProcedureWithMaterials, RowPatch};
use tracing::{debug, info, instrument, warn};

use crate::catalog::CatalogService;
use crate::error::{from_row, to_row, ServiceError, ServiceResult};

#[derive(Clone)]
pub struct ProcedureService {
    store: Arc<dyn RecordStore>,
    rows: CatalogService,
}

impl ProcedureService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            rows: CatalogService::new(store.clone()),
            store,
        }
    }

    /// All procedures, or those of one service standard
    pub async fn list(&self, ps: Option<&str>) -> ServiceResult<Vec<Row>> {
        let mut query = ListQuery::by_id();
        if let Some(ps) = ps {
            query = query.filter("ps", ps);
        }
        Ok(self.store.list(Collection::Procedures, query).await?)
    }

    /// Procedure with its bill of materials
    pub async fn get(&self, id: Id) -> ServiceResult<ProcedureWithMaterials> {
        let procedure: Procedure = from_row(self.store.get(Collection::Procedures, id).await?)?;

        let bill = self
            .store
            .list(
                Collection::ProcedureMaterials,
                ListQuery::by_id().filter("procedure_id", id),
            )
            .await?;
        let materials: HashMap<Id, Material> = self
            .store
            .list(Collection::Materials, ListQuery::by_id())
            .await?
            .into_iter()
            .map(from_row::<Material>)
            .map(|material| material.map(|m| (m.id, m)))
            .collect::<ServiceResult<_>>()?;

        let materials = bill
            .iter()
            .filter_map(|line| {
                let material = line
                    .get("material_id")
                    .and_then(|v| v.as_i64())
                    .and_then(|material_id| materials.get(&material_id))?;
                Some(BomItem {
                    quantity: line.get("quantity").and_then(|v| v.as_i64()).unwrap_or(1),
                    material: material.clone(),
                })
            })
            .collect();

        Ok(ProcedureWithMaterials {
            procedure,
            materials,
        })
    }

    /// Create a procedure and its bill of materials
    #[instrument(skip(self, procedure))]
    pub async fn create(&self, procedure: NewProcedure) -> ServiceResult<ProcedureWithMaterials> {
        ProcedureContract.validate(&procedure).map_err(|errors| {
            debug!(errors = %errors, "procedure rejected");
            ServiceError::Validation(errors)
        })?;

        let row = self
            .store
            .insert_one(Collection::Procedures, to_row(&procedure)?)
            .await?;
        let id = row_id(&row)?;

        if !procedure.materials.is_empty() {
            let bill = procedure
                .materials
                .iter()
                .filter_map(|entry| {
                    json!({
                        "procedure_id": id,
                        "material_id": entry.material_id,
                        "quantity": entry.quantity,
                    })
                    .as_object()
                    .cloned()
                })
                .collect();

            if let Err(error) = self.store.insert(Collection::ProcedureMaterials, bill).await {
                warn!(procedure_id = id, error = %error, "bill of materials failed, removing procedure");
                if let Err(cleanup) = self.store.delete(Collection::Procedures, id).await {
                    tracing::error!(procedure_id = id, error = %cleanup, "compensating delete failed");
                }
                return Err(error.into());
            }
        }

        info!(procedure_id = id, materials = procedure.materials.len(), "procedure created");
        self.get(id).await
    }

    pub async fn patch(&self, patch: RowPatch) -> ServiceResult<Row> {
        self.rows.patch(Collection::Procedures, patch).await
    }

    pub async fn delete(&self, id: Id) -> ServiceResult<Id> {
        self.rows.delete(Collection::Procedures, id).await
    }
}
