//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `POST /orders`                 – place an order
//! - `GET  /orders`                 – list all orders
//! - `GET  /orders/{id}`            – get one order
//! - `GET  /users/{id}/orders`      – list a buyer's orders
//! - `GET  /events`                 – list events
//! - `GET  /events/{id}`            – get one event
//! - `GET  /events/by-name/{name}`  – find an event by exact name
//! - `GET  /users/{id}`             – get an account
//! - `POST /users/{id}/top-up`      – credit an account

use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use boxoffice_core::entities::account::Account;
use boxoffice_core::entities::event::Event;
use boxoffice_core::entities::order::Order;
use boxoffice_core::framework::StorageError;
use boxoffice_sdk::objects::{
    AccountResponse, ErrorResponse, EventResponse, EventSnapshotResponse, OrderLineResponse,
    OrderResponse, TicketClassResponse,
};

use crate::state::AppState;

mod accounts;
mod catalog;
mod orders;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(orders::router())
        .merge(catalog::router())
        .merge(accounts::router())
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn unix_timestamp(date: time::PrimitiveDateTime) -> i64 {
    date.assume_utc().unix_timestamp()
}

/// Convert an `Order` (core model) into an `OrderResponse` (API model).
fn order_to_response(order: &Order) -> OrderResponse {
    OrderResponse {
        id: order.id.0,
        created_at: order.created_at.unix_timestamp(),
        buyer_id: order.buyer_id.0,
        buyer_name: order.buyer_name.clone(),
        event_id: order.event_id.0,
        event: order.event.as_ref().map(|e| EventSnapshotResponse {
            name: e.name.clone(),
            date: unix_timestamp(e.date),
            location: e.location.clone(),
        }),
        lines: order
            .lines
            .iter()
            .map(|l| OrderLineResponse {
                ticket_class_id: l.ticket_class_id.0,
                label: l.label.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect(),
        total_price: order.total_price,
        payment_method: order.payment_method.clone(),
        status: order.status.into(),
    }
}

fn event_to_response(event: &Event) -> EventResponse {
    EventResponse {
        id: event.id.0,
        name: event.name.clone(),
        date: unix_timestamp(event.date),
        location: event.location.clone(),
        description: event.description.clone(),
        ticket_classes: event
            .ticket_classes
            .iter()
            .map(|c| TicketClassResponse {
                id: c.id.0,
                label: c.label.clone(),
                unit_price: c.unit_price,
                stock: c.stock,
            })
            .collect(),
    }
}

fn account_to_response(account: &Account) -> AccountResponse {
    AccountResponse {
        id: account.id.0,
        name: account.name.clone(),
        balance: account.balance,
    }
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors of the read and top-up handlers. `POST /orders` has its own
/// response type because it always returns an order.
#[derive(Debug)]
enum ApiError {
    Storage(StorageError),
    NotFound(&'static str),
    BadRequest(String),
}

impl From<StorageError> for ApiError {
    fn from(value: StorageError) -> Self {
        ApiError::Storage(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "API storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("internal server error")),
                )
                    .into_response()
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("{what} not found"))),
            )
                .into_response(),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
        }
    }
}
