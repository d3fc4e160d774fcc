use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use boxoffice_core::entities::UserId;
use boxoffice_core::ledger::LedgerError;
use boxoffice_sdk::objects::TopUpRequest;
use rust_decimal::Decimal;

use super::{ApiError, account_to_response};
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}", get(get_account))
        .route("/users/{id}/top-up", post(top_up))
}

async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .engine
        .ledger()
        .find_by_id(UserId(id))
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(account_to_response(&account)))
}

/// `POST /users/{id}/top-up` – credit a positive amount.
async fn top_up(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TopUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest(
            "top-up amount must be positive".to_string(),
        ));
    }
    let ledger = state.engine.ledger();
    let id = UserId(id);
    let balance = ledger
        .credit(id, request.amount)
        .await
        .map_err(|e| match e {
            LedgerError::AccountNotFound => ApiError::NotFound("user"),
            LedgerError::Storage(e) => ApiError::Storage(e),
            other => ApiError::BadRequest(other.to_string()),
        })?;
    tracing::info!(user_id = %id, amount = %request.amount, %balance, "Account topped up");

    let account = ledger
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(account_to_response(&account)))
}
