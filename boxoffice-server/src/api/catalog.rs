use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use boxoffice_core::entities::EventId;

use super::{ApiError, event_to_response};
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}", get(get_event))
        .route("/events/by-name/{name}", get(find_event_by_name))
}

async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let events = state.engine.catalog().list().await?;
    Ok(Json(events.iter().map(event_to_response).collect::<Vec<_>>()))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .engine
        .catalog()
        .find_by_id(EventId(id))
        .await?
        .ok_or(ApiError::NotFound("event"))?;
    Ok(Json(event_to_response(&event)))
}

async fn find_event_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .engine
        .catalog()
        .find_by_name(&name)
        .await?
        .ok_or(ApiError::NotFound("event"))?;
    Ok(Json(event_to_response(&event)))
}
