use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use boxoffice_core::engine::{OrderError, PlaceOrder, Rejected};
use boxoffice_core::entities::{EventId, OrderId, UserId};
use boxoffice_sdk::objects::{PlaceOrderRequest, PlaceOrderResponse, RejectionDetail};
use kanau::processor::Processor;
use std::time::Duration;

use super::{ApiError, order_to_response};
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/{id}", get(get_order))
        .route("/users/{id}/orders", get(list_orders_for_user))
}

/// `POST /orders` – place an order.
///
/// Responds with the recorded order in every case; failures also carry
/// an `error` detail and a status code matching the failure.
async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, PlaceOrderError> {
    let mut cmd = PlaceOrder::new(
        UserId(request.user_id),
        EventId(request.event_id),
        request.lines.into_iter().map(Into::into).collect(),
    );
    if let Some(ms) = request.timeout_ms {
        cmd = cmd.with_timeout(Duration::from_millis(ms));
    }

    let order = state.engine.process(cmd).await.map_err(PlaceOrderError)?;
    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            order: order_to_response(&order),
            error: None,
        }),
    ))
}

/// `GET /orders`
async fn list_orders(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let orders = state.engine.list_orders().await?;
    Ok(Json(orders.iter().map(order_to_response).collect::<Vec<_>>()))
}

/// `GET /orders/{id}`
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .engine
        .get_order(OrderId(id))
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    Ok(Json(order_to_response(&order)))
}

/// `GET /users/{id}/orders` – empty for a user without orders, even an unknown one.
async fn list_orders_for_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.engine.list_orders_for_user(UserId(id)).await?;
    Ok(Json(orders.iter().map(order_to_response).collect::<Vec<_>>()))
}

struct PlaceOrderError(Rejected);

fn status_code(reason: &OrderError) -> StatusCode {
    match reason {
        OrderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        OrderError::EventNotFound(_)
        | OrderError::UserNotFound(_)
        | OrderError::TicketClassNotFound(_) => StatusCode::NOT_FOUND,
        OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
        OrderError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
        OrderError::DeadlineExceeded { .. } => StatusCode::GATEWAY_TIMEOUT,
        OrderError::CompensationFailed { .. } | OrderError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for PlaceOrderError {
    fn into_response(self) -> axum::response::Response {
        let Rejected { order, reason } = self.0;
        let needs_remediation = reason.needs_remediation();
        // internal faults are logged by the engine; keep details out of the body
        let message = if needs_remediation {
            "order could not be completed, it has been flagged for review".to_string()
        } else {
            reason.to_string()
        };
        let body = PlaceOrderResponse {
            order: order_to_response(&order),
            error: Some(RejectionDetail {
                status: order.status.into(),
                message,
                needs_remediation,
            }),
        };
        (status_code(&reason), Json(body)).into_response()
    }
}
