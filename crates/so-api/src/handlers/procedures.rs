//! Procedure handlers
//!
//! A procedure read by id carries its bill of materials; creation may
//! include one.

use axum::extract::State;
use serde_json::{json, Value};
use so_db::Row;
use so_models::{NewProcedure, ProcedureWithMaterials, RowPatch};

use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extractors::{AppState, JsonBody, Params};
use crate::handlers::{catalog::rows, decode};

/// GET /api/procedures[?id=|?ps=]
pub async fn read(State(state): State<AppState>, params: Params) -> ApiResult<Envelope<Value>> {
    if let Some(id) = params.id()? {
        let procedure = state.procedures.get(id).await?;
        return Ok(Envelope::ok(json!(procedure)));
    }
    let list = state.procedures.list(params.ps()).await?;
    Ok(Envelope::ok(rows(list)))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Envelope<ProcedureWithMaterials>> {
    let procedure: NewProcedure = decode(body)?;
    let created = state.procedures.create(procedure).await?;
    Ok(Envelope::created(created))
}

pub async fn update(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Envelope<Row>> {
    let patch = RowPatch::from_body(body)?;
    Ok(Envelope::ok(state.procedures.patch(patch).await?))
}

pub async fn remove(State(state): State<AppState>, params: Params) -> ApiResult<Envelope<Value>> {
    let id = state.procedures.delete(params.required_id()?).await?;
    Ok(Envelope::ok(json!({ "deletedId": id })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{call, call_json, test_app};

    #[tokio::test]
    async fn test_create_and_read_back() {
        let app = test_app().await;

        let (status, body) = call_json(
            &app,
            "POST",
            "/api/procedures",
            json!({
                "name": "Lubrificar",
                "description": "Graxa nos mancais",
                "estimated_time": 30,
                "ps": "SF-02",
                "materials": [{ "material_id": 1, "quantity": 2 }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(&app, "GET", &format!("/api/procedures?id={}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["estimated_time"], 30);
        assert_eq!(body["data"]["ps"], "SF-02");
        assert_eq!(body["data"]["materials"][0]["quantity"], 2);
        assert_eq!(body["data"]["materials"][0]["material"]["name"], "Cabo");
    }

    #[tokio::test]
    async fn test_filter_by_ps() {
        let app = test_app().await;

        let (_, body) = call(&app, "GET", "/api/procedures?ps=SF-06").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (_, body) = call(&app, "GET", "/api/procedures?ps=SF-99").await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_description() {
        let app = test_app().await;
        let (status, body) =
            call_json(&app, "POST", "/api/procedures", json!({ "name": "Sem descrição" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_delete_missing_procedure() {
        let app = test_app().await;
        let (status, _) = call(&app, "DELETE", "/api/procedures?id=77").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
