//! Service order handlers
//!
//! POST runs the composite create, PUT updates scalar fields only and PATCH
//! also replaces every association group it carries.

use axum::extract::State;
use serde_json::{json, Value};
use so_db::Row;
use so_models::{NewOrder, OrderAggregate, OrderChanges};
use so_services::CreatedOrder;

use crate::envelope::Envelope;
use crate::error::ApiResult;
use crate::extractors::{AppState, JsonBody, Params};
use crate::handlers::catalog::rows;

/// GET /api/services[?id=]
pub async fn read(State(state): State<AppState>, params: Params) -> ApiResult<Envelope<Value>> {
    if let Some(id) = params.id()? {
        let order = state.orders.get(id).await?;
        return Ok(Envelope::ok(json!(order)));
    }
    Ok(Envelope::ok(rows(state.orders.list().await?)))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Envelope<CreatedOrder>> {
    let order = NewOrder::from_body(body)?;
    let created = state.orders.create(order).await?;

    let envelope = if created.is_complete() {
        Envelope::created(created).with_message("Service created")
    } else {
        let failed = created.failures.keys().copied().collect::<Vec<_>>().join(", ");
        Envelope::created(created)
            .with_message(format!("Service created; could not save: {}", failed))
    };
    Ok(envelope)
}

/// PUT: scalar fields only
pub async fn replace(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Envelope<Row>> {
    let changes = OrderChanges::from_body(body)?;
    Ok(Envelope::ok(state.orders.update_fields(changes).await?))
}

/// PATCH: scalar fields plus submitted association groups
pub async fn update(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Envelope<OrderAggregate>> {
    let changes = OrderChanges::from_body(body)?;
    Ok(Envelope::ok(state.orders.update(changes).await?))
}

pub async fn remove(State(state): State<AppState>, params: Params) -> ApiResult<Envelope<Value>> {
    let id = state.orders.delete(params.required_id()?).await?;
    Ok(Envelope::ok(json!({ "deletedId": id })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::testing::{call, call_json, test_app};

    fn new_order() -> Value {
        json!({
            "service": {
                "type": "Troca de válvula",
                "ps": "SF-06",
                "start_date": "2024-01-10",
                "end_date": "2024-01-12",
                "responsible": "A. Silva",
                "status": "Planejamento"
            },
            "team": [1],
            "procedures": [{ "id_procedure": 1, "execution_order": 1 }],
            "materials": [{ "material_id": 1, "quantity": 4 }],
            "observations": "Levar escada"
        })
    }

    #[tokio::test]
    async fn test_create_then_read_aggregate() {
        let app = test_app().await;

        let (status, body) = call_json(&app, "POST", "/api/services", new_order()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["service"]["type"], "Troca de válvula");
        assert_eq!(body["data"]["associations"]["procedures"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["associations"]["materials"][0]["quantity"], 4);
        let id = body["data"]["service"]["id"].as_i64().unwrap();

        let (status, body) = call(&app, "GET", &format!("/api/services?id={}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["procedure_order"][0]["execution_order"], 1);
        assert_eq!(body["data"]["service_materials"][0]["quantity"], 4);
        assert_eq!(body["data"]["service_team"][0]["team"]["name"], "Ana");
        assert_eq!(body["data"]["observations"][0]["description"], "Levar escada");
    }

    #[tokio::test]
    async fn test_create_without_procedures_is_rejected() {
        let app = test_app().await;
        let mut order = new_order();
        order.as_object_mut().unwrap().remove("procedures");

        let (status, body) = call_json(&app, "POST", "/api/services", order).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("procedures"));

        let (_, body) = call(&app, "GET", "/api/services").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let app = test_app().await;
        call_json(&app, "POST", "/api/services", new_order()).await;

        let (status, body) = call(&app, "GET", "/api/services").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["id"], 2);
        assert_eq!(body["data"][1]["id"], 1);
    }

    #[tokio::test]
    async fn test_patch_clears_materials_only() {
        let app = test_app().await;
        let (_, body) = call_json(&app, "POST", "/api/services", new_order()).await;
        let id = body["data"]["service"]["id"].as_i64().unwrap();

        let (status, body) = call_json(
            &app,
            "PATCH",
            "/api/services",
            json!({ "id": id, "status": "Em Andamento", "materials": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "Em Andamento");
        assert!(body["data"]["service_materials"].as_array().unwrap().is_empty());
        assert_eq!(body["data"]["procedure_order"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["service_team"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_ignores_groups() {
        let app = test_app().await;
        let (_, body) = call_json(&app, "POST", "/api/services", new_order()).await;
        let id = body["data"]["service"]["id"].as_i64().unwrap();

        let (status, body) = call_json(
            &app,
            "PUT",
            "/api/services",
            json!({ "id": id, "responsible": "B. Souza", "materials": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["responsible"], "B. Souza");

        let (_, body) = call(&app, "GET", &format!("/api/services?id={}", id)).await;
        assert_eq!(body["data"]["service_materials"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_echoes_ppe_under_request_key() {
        let app = test_app().await;
        let mut order = new_order();
        order["epi"] = json!([{ "epi_id": 1, "quantity": 2 }]);

        let (status, body) = call_json(&app, "POST", "/api/services", order).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["associations"]["epi"][0]["quantity"], 2);
    }

    #[tokio::test]
    async fn test_end_date_alone_cannot_precede_stored_start() {
        let app = test_app().await;
        let (_, body) = call_json(&app, "POST", "/api/services", new_order()).await;
        let id = body["data"]["service"]["id"].as_i64().unwrap();

        for method in ["PATCH", "PUT"] {
            let (status, body) = call_json(
                &app,
                method,
                "/api/services",
                json!({ "id": id, "end_date": "2023-01-01" }),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("end_date"));
        }

        let (_, body) = call(&app, "GET", &format!("/api/services?id={}", id)).await;
        assert_eq!(body["data"]["end_date"], "2024-01-12");
    }

    #[tokio::test]
    async fn test_patch_missing_order_is_404() {
        let app = test_app().await;
        let (status, body) =
            call_json(&app, "PATCH", "/api/services", json!({ "id": 99, "status": "Concluído" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_delete_order() {
        let app = test_app().await;

        let (status, body) = call(&app, "DELETE", "/api/services?id=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deletedId"], 1);

        let (status, _) = call(&app, "GET", "/api/services?id=1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "DELETE", "/api/services?id=1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
