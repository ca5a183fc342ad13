//! Order aggregate assembled from plain list queries
//!
//! Backends without a join engine build the eager-loaded view here. The shape
//! matches the single-query version in [`crate::postgres`].

use serde_json::{json, Value};
use so_core::traits::Id;
use so_models::Collection;
use std::collections::HashMap;

use crate::repository::{row_id, ListQuery, RecordStore, Row, StoreResult};

/// Build the order aggregate from individual reads
pub async fn assemble_order_aggregate<S>(store: &S, id: Id) -> StoreResult<Row>
where
    S: RecordStore + ?Sized,
{
    let mut aggregate = store.get(Collection::Services, id).await?;

    let team = index(store, Collection::Team).await?;
    let procedures = index(store, Collection::Procedures).await?;
    let materials = index(store, Collection::Materials).await?;
    let equipments = index(store, Collection::Equipments).await?;
    let epi = index(store, Collection::Epi).await?;

    let service_team: Vec<Value> = links(store, Collection::ServiceTeam, id)
        .await?
        .iter()
        .filter_map(|link| lookup(&team, link, "team_id"))
        .map(|member| json!({ "team": pick(member, &["id", "name", "position", "primary_contact"]) }))
        .collect();

    let mut scheduled = links(store, Collection::ProcedureOrder, id).await?;
    scheduled.sort_by_key(|link| {
        (
            link.get("execution_order").and_then(Value::as_i64).unwrap_or(0),
            link.get("id").and_then(Value::as_i64).unwrap_or(0),
        )
    });
    let procedure_order: Vec<Value> = scheduled
        .iter()
        .filter_map(|link| {
            lookup(&procedures, link, "id_procedure").map(|procedure| {
                json!({
                    "execution_order": link.get("execution_order").cloned().unwrap_or(Value::Null),
                    "procedure": procedure,
                })
            })
        })
        .collect();

    let service_materials: Vec<Value> = links(store, Collection::ServiceMaterials, id)
        .await?
        .iter()
        .filter_map(|link| {
            lookup(&materials, link, "material_id").map(|material| {
                json!({ "quantity": link.get("quantity").cloned().unwrap_or(Value::Null), "material": material })
            })
        })
        .collect();

    let service_equipments: Vec<Value> = links(store, Collection::ServiceEquipments, id)
        .await?
        .iter()
        .filter_map(|link| lookup(&equipments, link, "equipment_id"))
        .map(|equipment| json!({ "equipment": equipment }))
        .collect();

    let service_epi: Vec<Value> = links(store, Collection::ServiceEpi, id)
        .await?
        .iter()
        .filter_map(|link| {
            lookup(&epi, link, "epi_id").map(|item| {
                json!({ "quantity": link.get("quantity").cloned().unwrap_or(Value::Null), "epi_item": item })
            })
        })
        .collect();

    let observations: Vec<Value> = store
        .list(
            Collection::Observations,
            ListQuery::new()
                .filter("service_id", id)
                .order_by("observation_date", true),
        )
        .await?
        .iter()
        .map(|observation| {
            let author = lookup(&team, observation, "team_member_id")
                .map(|member| pick(member, &["id", "name", "position"]))
                .unwrap_or(Value::Null);
            let mut view = pick(
                observation,
                &["id", "description", "observation_date", "observation_type"],
            );
            view["team_member"] = author;
            view
        })
        .collect();

    aggregate.insert("service_team".into(), Value::Array(service_team));
    aggregate.insert("procedure_order".into(), Value::Array(procedure_order));
    aggregate.insert("service_materials".into(), Value::Array(service_materials));
    aggregate.insert("service_equipments".into(), Value::Array(service_equipments));
    aggregate.insert("service_epi".into(), Value::Array(service_epi));
    aggregate.insert("observations".into(), Value::Array(observations));

    Ok(aggregate)
}

async fn links<S>(store: &S, collection: Collection, service_id: Id) -> StoreResult<Vec<Row>>
where
    S: RecordStore + ?Sized,
{
    store
        .list(collection, ListQuery::by_id().filter("service_id", service_id))
        .await
}

async fn index<S>(store: &S, collection: Collection) -> StoreResult<HashMap<Id, Row>>
where
    S: RecordStore + ?Sized,
{
    let rows = store.list(collection, ListQuery::by_id()).await?;
    rows.into_iter()
        .map(|row| row_id(&row).map(|id| (id, row)))
        .collect()
}

fn lookup<'a>(index: &'a HashMap<Id, Row>, row: &Row, column: &str) -> Option<&'a Row> {
    row.get(column)
        .and_then(Value::as_i64)
        .and_then(|id| index.get(&id))
}

fn pick(row: &Row, columns: &[&str]) -> Value {
    let picked: Row = columns
        .iter()
        .map(|column| {
            (
                column.to_string(),
                row.get(*column).cloned().unwrap_or(Value::Null),
            )
        })
        .collect();
    Value::Object(picked)
}
