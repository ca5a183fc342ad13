//! Catalog handlers: team, materials, equipments and PPE
//!
//! The four pick-list collections share one set of generic handlers,
//! instantiated per [`CatalogResource`].

use axum::extract::State;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use so_db::{Collection, Row};
use so_models::{NewEquipment, NewMaterial, NewPpeItem, NewTeamMember, RowPatch};
use validator::Validate;

use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extractors::{AppState, JsonBody, Params};
use crate::handlers::decode;

/// A catalog collection and its creation payload
pub trait CatalogResource: Send + Sync + 'static {
    const COLLECTION: Collection;
    type New: DeserializeOwned + Validate + Serialize + Send + Sync;
}

pub struct Team;
pub struct Materials;
pub struct Equipments;
pub struct Ppe;

impl CatalogResource for Team {
    const COLLECTION: Collection = Collection::Team;
    type New = NewTeamMember;
}

impl CatalogResource for Materials {
    const COLLECTION: Collection = Collection::Materials;
    type New = NewMaterial;
}

impl CatalogResource for Equipments {
    const COLLECTION: Collection = Collection::Equipments;
    type New = NewEquipment;
}

impl CatalogResource for Ppe {
    const COLLECTION: Collection = Collection::Epi;
    type New = NewPpeItem;
}

/// GET ?id= returns one row, otherwise the whole list by id
pub async fn read<R: CatalogResource>(
    State(state): State<AppState>,
    params: Params,
) -> ApiResult<Envelope<Value>> {
    let data = match params.id()? {
        Some(id) => Value::Object(state.catalog.get(R::COLLECTION, id).await?),
        None => rows(state.catalog.list(R::COLLECTION).await?),
    };
    Ok(Envelope::ok(data))
}

pub async fn create<R: CatalogResource>(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Envelope<Row>> {
    let payload: R::New = decode(body)?;
    let row = state.catalog.create(R::COLLECTION, &payload).await?;
    Ok(Envelope::created(row))
}

/// PATCH `{id, updatedData}`
pub async fn update<R: CatalogResource>(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Envelope<Row>> {
    let patch = RowPatch::from_body(body)?;
    let row = state.catalog.patch(R::COLLECTION, patch).await?;
    Ok(Envelope::ok(row))
}

pub async fn remove<R: CatalogResource>(
    State(state): State<AppState>,
    params: Params,
) -> ApiResult<Envelope<Value>> {
    let id = state
        .catalog
        .delete(R::COLLECTION, params.required_id()?)
        .await?;
    Ok(Envelope::ok(json!({ "deletedId": id })))
}

/// GET /api/catalog
///
/// Every pick-list the order form needs, read concurrently.
pub async fn pick_lists(State(state): State<AppState>) -> ApiResult<Envelope<Value>> {
    let (team, procedures, materials, equipments, epi) = tokio::try_join!(
        state.catalog.list(Collection::Team),
        state.procedures.list(None),
        state.catalog.list(Collection::Materials),
        state.catalog.list(Collection::Equipments),
        state.catalog.list(Collection::Epi),
    )?;

    Ok(Envelope::ok(json!({
        "team": team,
        "procedures": procedures,
        "materials": materials,
        "equipments": equipments,
        "epi": epi,
    })))
}

pub(crate) fn rows(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{call, call_json, test_app};

    #[tokio::test]
    async fn test_list_and_get_team() {
        let app = test_app().await;

        let (status, body) = call(&app, "GET", "/api/team").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["name"], "Ana");

        let (status, body) = call(&app, "GET", "/api/team?id=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["position"], "Técnica");

        let (status, body) = call(&app, "GET", "/api/team?id=99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_create_material_validates_unit() {
        let app = test_app().await;

        let (status, body) = call_json(
            &app,
            "POST",
            "/api/materials",
            json!({ "name": "Parafuso", "unity_of_measure": "UN" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["name"], "Parafuso");

        let (status, body) = call_json(
            &app,
            "POST",
            "/api/materials",
            json!({ "name": "Parafuso", "unity_of_measure": "furlong" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("unity_of_measure"));
    }

    #[tokio::test]
    async fn test_create_team_requires_position() {
        let app = test_app().await;
        let (status, body) = call_json(&app, "POST", "/api/team", json!({ "name": "Bruno" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("position"));
    }

    #[tokio::test]
    async fn test_patch_equipment() {
        let app = test_app().await;
        let (status, body) = call_json(
            &app,
            "PATCH",
            "/api/equipments",
            json!({ "id": 1, "updatedData": { "description": "25t" } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["description"], "25t");
        assert_eq!(body["data"]["name"], "Guindaste");

        let (status, _) = call_json(
            &app,
            "PATCH",
            "/api/equipments",
            json!({ "id": 1, "updatedData": { "colour": "red" } }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_404() {
        let app = test_app().await;

        let (status, body) = call(&app, "DELETE", "/api/epi?id=42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, body) = call(&app, "GET", "/api/epi").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_returns_deleted_id() {
        let app = test_app().await;
        let (status, body) = call(&app, "DELETE", "/api/epi?id=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deletedId"], 1);

        let (status, _) = call(&app, "DELETE", "/api/epi").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pick_lists() {
        let app = test_app().await;
        let (status, body) = call(&app, "GET", "/api/catalog").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["procedures"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["epi"][0]["name"], "Luva");
        assert_eq!(body["data"]["equipments"][0]["name"], "Guindaste");
    }
}
