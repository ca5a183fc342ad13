//! Router fixtures: a seeded in-memory store behind the full router

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use so_core::config::{AppConfig, AssociationPolicy};
use so_db::testing::seeded_memory_store;
use so_db::{ChangeFeed, ObservedStore, RecordStore};
use parking_lot::Mutex;
use so_reports::{
    DispatchSettings, DocumentRenderer, EmailMessage, EmailSender, RenderOptions,
    ReportDispatcher, ReportPage, ReportResult,
};
use tower::ServiceExt;

use crate::extractors::AppState;
use crate::routes::router;

struct FakeRenderer;

#[async_trait]
impl DocumentRenderer for FakeRenderer {
    async fn render(&self, _url: &str, _options: &RenderOptions) -> ReportResult<Vec<u8>> {
        Ok(b"%PDF-1.7".to_vec())
    }
}

/// Keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> ReportResult<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub async fn test_app() -> Router {
    test_app_with_mailer(Arc::new(RecordingMailer::default())).await
}

pub async fn test_app_with_mailer(mailer: Arc<dyn EmailSender>) -> Router {
    let feed = ChangeFeed::new(16);
    let store: Arc<dyn RecordStore> =
        Arc::new(ObservedStore::new(seeded_memory_store().await.unwrap(), feed.clone()));

    let dispatcher = ReportDispatcher::new(
        store.clone(),
        Arc::new(FakeRenderer),
        mailer,
        DispatchSettings::from_config(&AppConfig::default()),
    );
    let state = AppState::new(
        store,
        feed,
        AssociationPolicy::ProceduresRequired,
        Arc::new(dispatcher),
        Arc::new(ReportPage::new().unwrap()),
    );
    router().with_state(state)
}

/// Send a request and return the status with the raw body text
pub async fn call_raw(app: &Router, method: &str, uri: &str) -> (StatusCode, String) {
    send(app, Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, text) = call_raw(app, method, uri).await;
    (status, serde_json::from_str(&text).unwrap_or(Value::Null))
}

pub async fn call_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, text) = send(app, request).await;
    (status, serde_json::from_str(&text).unwrap_or(Value::Null))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}
