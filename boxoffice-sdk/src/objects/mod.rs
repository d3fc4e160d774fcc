pub mod accounts;
pub mod catalog;
pub mod orders;

pub use accounts::{AccountResponse, TopUpRequest};
pub use catalog::{EventResponse, TicketClassResponse};
pub use orders::{
    EventSnapshotResponse, OrderLineRequest, OrderLineResponse, OrderResponse, OrderStatus,
    PlaceOrderRequest, PlaceOrderResponse, RejectionDetail,
};

use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint that fails without producing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
