//! Server-sent row events
//!
//! `GET /api/changes[?collection=]` streams every committed single-row write,
//! optionally narrowed to one collection. Clients that fall behind skip the
//! events they missed.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use so_db::{Collection, RowEvent};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, Params};

pub async fn stream(
    State(state): State<AppState>,
    params: Params,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let filter = match params.collection.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) => Some(name.parse::<Collection>().map_err(ApiError::bad_request)?),
    };

    let events = BroadcastStream::new(state.feed.subscribe()).filter_map(move |received| {
        match received {
            Ok(event) if filter.map_or(true, |c| c == event.collection) => to_sse(&event),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "change stream subscriber lagged");
                None
            }
        }
    });

    Ok(Sse::new(events.map(Ok)).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &RowEvent) -> Option<Event> {
    Event::default()
        .event(event.collection.name())
        .id(event.id.to_string())
        .json_data(event)
        .ok()
}
