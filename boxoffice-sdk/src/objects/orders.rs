//! Order placement payloads and order read models.

use serde::{Deserialize, Serialize};

/// Terminal outcome of one purchase attempt.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `boxoffice-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Success,
    EventNotFound,
    UserNotFound,
    LineNotFound,
    InsufficientStock,
    InsufficientBalance,
    DeadlineExceeded,
    InvalidRequest,
    StorageFault,
}

impl OrderStatus {
    pub fn is_success(self) -> bool {
        self == OrderStatus::Success
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Success => "SUCCESS",
            OrderStatus::EventNotFound => "EVENT_NOT_FOUND",
            OrderStatus::UserNotFound => "USER_NOT_FOUND",
            OrderStatus::LineNotFound => "LINE_NOT_FOUND",
            OrderStatus::InsufficientStock => "INSUFFICIENT_STOCK",
            OrderStatus::InsufficientBalance => "INSUFFICIENT_BALANCE",
            OrderStatus::DeadlineExceeded => "DEADLINE_EXCEEDED",
            OrderStatus::InvalidRequest => "INVALID_REQUEST",
            OrderStatus::StorageFault => "STORAGE_FAULT",
        };
        f.write_str(s)
    }
}

/// A requested ticket line, not yet priced.
///
/// At least one of `ticket_class_id` and `label` should be set. When both are
/// present and disagree, the id wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_class_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub quantity: u32,
}

/// Request payload for `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: i64,
    pub event_id: i64,
    pub lines: Vec<OrderLineRequest>,
    /// Overrides the server's default deadline for this attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineResponse {
    pub ticket_class_id: i64,
    pub label: String,
    pub quantity: u32,
    pub unit_price: rust_decimal::Decimal,
}

/// Event fields copied into the order at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshotResponse {
    pub name: String,
    pub date: i64,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: i64,
    /// Unix timestamp of when the order was created.
    pub created_at: i64,
    pub buyer_id: i64,
    pub buyer_name: Option<String>,
    pub event_id: i64,
    pub event: Option<EventSnapshotResponse>,
    pub lines: Vec<OrderLineResponse>,
    pub total_price: rust_decimal::Decimal,
    pub payment_method: String,
    pub status: OrderStatus,
}

impl OrderResponse {
    /// Sum of `unit_price * quantity` over the lines.
    pub fn lines_total(&self) -> rust_decimal::Decimal {
        self.lines
            .iter()
            .map(|l| l.unit_price * rust_decimal::Decimal::from(l.quantity))
            .sum()
    }
}

/// Why an order was not fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionDetail {
    pub status: OrderStatus,
    pub message: String,
    /// Set when the failure needs out-of-band remediation.
    #[serde(default)]
    pub needs_remediation: bool,
}

/// Response of `POST /orders`: the recorded order, plus the rejection if it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    pub order: OrderResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RejectionDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::InsufficientBalance).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_BALANCE\"");
        let parsed: OrderStatus = serde_json::from_str("\"LINE_NOT_FOUND\"").unwrap();
        assert_eq!(parsed, OrderStatus::LineNotFound);
        assert_eq!(OrderStatus::EventNotFound.to_string(), "EVENT_NOT_FOUND");
    }

    #[test]
    fn test_line_request_accepts_label_only() {
        let line: OrderLineRequest =
            serde_json::from_str(r#"{"label":"VIP","quantity":2}"#).unwrap();
        assert_eq!(line.ticket_class_id, None);
        assert_eq!(line.label.as_deref(), Some("VIP"));
        assert_eq!(line.quantity, 2);
    }
}
