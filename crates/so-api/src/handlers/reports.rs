//! Report page and report delivery

use axum::{
    extract::{Path, State},
    response::Html,
};
use serde_json::Value;
use so_models::{parse_id, DeliveryRequest};

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, JsonBody};

/// GET /order/service/:id
///
/// The page the document renderer prints.
pub async fn report_page(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Html<String>> {
    let id = parse_id(&Value::String(raw_id.clone()))
        .ok_or_else(|| ApiError::bad_request(format!("invalid service id '{}'", raw_id)))?;
    let order = state.orders.get(id).await?;
    let html = state
        .report_page
        .render(&order)
        .map_err(ApiError::from)?;
    Ok(Html(html))
}

/// POST /api/send_order `{id, channel, destination}`
pub async fn send_order(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> ApiResult<Envelope<()>> {
    let request = DeliveryRequest::from_body(body)?;
    state.dispatcher.send(&request).await?;
    Ok(Envelope::<()>::done(format!("Report sent via {}", request.channel)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;
    use so_reports::ConsoleEmailSender;

    use crate::testing::{call, call_json, call_raw, test_app, test_app_with_mailer, RecordingMailer};

    #[tokio::test]
    async fn test_report_page_renders_html() {
        let app = test_app().await;
        let (status, html) = call_raw(&app, "GET", "/order/service/1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("RELATÓRIO DE SERVIÇO"));
        assert!(html.contains("Troca"));
    }

    #[tokio::test]
    async fn test_report_page_missing_order() {
        let app = test_app().await;
        let (status, body) = call(&app, "GET", "/order/service/5").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = call(&app, "GET", "/order/service/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_order_email() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = test_app_with_mailer(mailer.clone()).await;
        let (status, body) = call_json(
            &app,
            "POST",
            "/api/send_order",
            json!({ "id": 1, "channel": "email", "destination": "cliente@example.com" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to[0].email, "cliente@example.com");
        assert_eq!(sent[0].attachments[0].filename, "servico-1.pdf");
    }

    #[tokio::test]
    async fn test_email_without_transport_fails() {
        let app = test_app_with_mailer(Arc::new(ConsoleEmailSender::new())).await;
        let (status, body) = call_json(
            &app,
            "POST",
            "/api/send_order",
            json!({ "id": 1, "channel": "email", "destination": "cliente@example.com" }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("email"));
    }

    #[tokio::test]
    async fn test_send_order_rejects_bad_requests() {
        let app = test_app().await;

        let (status, body) = call_json(
            &app,
            "POST",
            "/api/send_order",
            json!({ "id": 1, "channel": "fax", "destination": "x" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = call_json(
            &app,
            "POST",
            "/api/send_order",
            json!({ "id": 1, "channel": "email", "destination": "not-an-address" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call_json(
            &app,
            "POST",
            "/api/send_order",
            json!({ "id": 40, "channel": "email", "destination": "cliente@example.com" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_whatsapp_without_provider_fails() {
        let app = test_app().await;
        let (status, body) = call_json(
            &app,
            "POST",
            "/api/send_order",
            json!({ "id": 1, "channel": "whatsapp", "destination": "11 98765-4321" }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("whatsapp"));
    }
}
