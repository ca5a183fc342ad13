//! Seed data shared by the service and API test suites

use serde_json::{json, Value};

use crate::memory::MemoryRecordStore;
use crate::repository::{RecordStore, Row, StoreResult};
use so_models::Collection;

/// Object literal as a row; anything else is an empty row
pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// One row of each catalog kind, a second procedure and order 1
pub fn fixtures() -> Vec<(Collection, Row)> {
    vec![
        (Collection::Team, row(json!({ "name": "Ana", "position": "Técnica", "primary_contact": "11 9999-0000" }))),
        (Collection::Procedures, row(json!({ "name": "Isolar linha", "description": "Fechar válvulas", "estimated_time": 30, "ps": "SF-06" }))),
        (Collection::Procedures, row(json!({ "name": "Trocar válvula", "description": "Substituir", "estimated_time": 45, "ps": "SF-06" }))),
        (Collection::Materials, row(json!({ "name": "Cabo", "unity_of_measure": "M" }))),
        (Collection::Equipments, row(json!({ "name": "Guindaste", "description": "10t" }))),
        (Collection::Epi, row(json!({ "name": "Luva", "description": "Nitrílica" }))),
        (Collection::Services, row(json!({ "type": "Troca", "ps": "SF-06", "status": "Planejamento" }))),
    ]
}

pub async fn seed(store: &dyn RecordStore) -> StoreResult<()> {
    for (collection, row) in fixtures() {
        store.insert_one(collection, row).await?;
    }
    Ok(())
}

pub async fn seeded_memory_store() -> StoreResult<MemoryRecordStore> {
    let store = MemoryRecordStore::new();
    seed(&store).await?;
    Ok(store)
}
