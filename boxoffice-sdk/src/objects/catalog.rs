//! Event catalog read models.

use serde::{Deserialize, Serialize};

/// One priced, finite-stock ticket category of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClassResponse {
    pub id: i64,
    pub label: String,
    pub unit_price: rust_decimal::Decimal,
    pub stock: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: i64,
    pub name: String,
    /// Unix timestamp of the event start.
    pub date: i64,
    pub location: String,
    pub description: String,
    pub ticket_classes: Vec<TicketClassResponse>,
}
