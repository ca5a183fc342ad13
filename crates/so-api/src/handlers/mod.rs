//! Request handlers, one module per resource

pub mod catalog;
pub mod changes;
pub mod observations;
pub mod procedures;
pub mod reports;
pub mod services;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Decode a typed payload; shape errors are the client's
pub(crate) fn decode<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    if !body.is_object() {
        return Err(ApiError::bad_request("request body must be a JSON object"));
    }
    serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))
}
