//! Observation handlers

use axum::extract::State;
use serde_json::Value;
use so_db::Row;
use so_models::{parse_id, NewObservation};

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, JsonBody, Params};
use crate::handlers::{catalog::rows, decode};

/// GET /api/observations?service_id=
pub async fn list(State(state): State<AppState>, params: Params) -> ApiResult<Envelope<Value>> {
    let observations = state.observations.list(params.service_id()?).await?;
    Ok(Envelope::ok(rows(observations)))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(mut body): JsonBody,
) -> ApiResult<Envelope<Row>> {
    // form selects post ids as strings
    for key in ["service_id", "team_member_id"] {
        let normalized = match body.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(text)) if text.trim().is_empty() => Value::Null,
            Some(other) => parse_id(other).map(Value::from).ok_or_else(|| {
                ApiError::bad_request(format!("{} must be a positive integer", key))
            })?,
        };
        if let Some(slot) = body.get_mut(key) {
            *slot = normalized;
        }
    }
    if body.get("service_id").map_or(true, Value::is_null) {
        return Err(ApiError::bad_request("service_id is required"));
    }

    let observation: NewObservation = decode(body)?;
    let row = state.observations.add(observation).await?;
    Ok(Envelope::created(row))
}
