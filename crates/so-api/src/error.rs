//! API error handling
//!
//! Every failure leaves the handler as an [`ApiError`] and is rendered as a
//! `success: false` envelope. Not-found is always 404, bad input 400, and
//! anything that failed past validation 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use so_core::ValidationErrors;
use so_reports::ReportError;
use so_services::ServiceError;
use tracing::{debug, error};

use crate::envelope::Envelope;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound { resource: &'static str, id: String },
    Validation(ValidationErrors),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound { resource, id } => format!("{} {} not found", resource, id),
            ApiError::Validation(errors) => errors.full_messages().join(", "),
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        debug!(errors = %errors, "request rejected");
        ApiError::Validation(errors)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => errors.into(),
            ServiceError::NotFound { entity, id } => ApiError::not_found(entity, id),
            other => {
                error!(error = %other, "service failure");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::InvalidDestination(_) => ApiError::BadRequest(err.to_string()),
            ReportError::OrderNotFound(id) => ApiError::not_found("service", id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Envelope::<()>::failure(self.status_code(), self.message()).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
