//! Application state and request extractors

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use so_core::config::AssociationPolicy;
use so_core::Id;
use so_db::{ChangeFeed, RecordStore};
use so_models::parse_id;
use so_reports::{ReportDispatcher, ReportPage};
use so_services::{CatalogService, ObservationService, OrderComposer, ProcedureService};

use crate::error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub feed: ChangeFeed,
    pub orders: OrderComposer,
    pub catalog: CatalogService,
    pub procedures: ProcedureService,
    pub observations: ObservationService,
    pub dispatcher: Arc<ReportDispatcher>,
    pub report_page: Arc<ReportPage>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        feed: ChangeFeed,
        policy: AssociationPolicy,
        dispatcher: Arc<ReportDispatcher>,
        report_page: Arc<ReportPage>,
    ) -> Self {
        Self {
            orders: OrderComposer::new(store.clone(), policy),
            catalog: CatalogService::new(store.clone()),
            procedures: ProcedureService::new(store.clone()),
            observations: ObservationService::new(store.clone()),
            store,
            feed,
            dispatcher,
            report_page,
        }
    }
}

/// JSON body whose rejections render as envelopes
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Query parameters accepted across the API
///
/// Everything arrives as text; ids are parsed on use so a malformed one is
/// reported as a 400 envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    pub id: Option<String>,
    pub ps: Option<String>,
    pub service_id: Option<String>,
    pub collection: Option<String>,
}

impl QueryParams {
    /// `?id=` when present
    pub fn id(&self) -> Result<Option<Id>, ApiError> {
        parse_param("id", self.id.as_deref())
    }

    /// `?id=`, which must be present
    pub fn required_id(&self) -> Result<Id, ApiError> {
        self.id()?
            .ok_or_else(|| ApiError::bad_request("id is required"))
    }

    pub fn service_id(&self) -> Result<Id, ApiError> {
        parse_param("service_id", self.service_id.as_deref())?
            .ok_or_else(|| ApiError::bad_request("service_id is required"))
    }

    pub fn ps(&self) -> Option<&str> {
        self.ps.as_deref().map(str::trim).filter(|ps| !ps.is_empty())
    }
}

fn parse_param(name: &str, raw: Option<&str>) -> Result<Option<Id>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_id(&Value::String(text.to_string()))
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("{} must be a positive integer", name))),
    }
}

/// Query extractor that never rejects with a plain-text body
pub struct Params(pub QueryParams);

#[async_trait]
impl<S> FromRequestParts<S> for Params
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<QueryParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(Params(params))
    }
}

impl std::ops::Deref for Params {
    type Target = QueryParams;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
