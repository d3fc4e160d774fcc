use super::event::EventSnapshot;
use super::{EventId, OrderId, TicketClassId, UserId};
use boxoffice_sdk::objects::{
    OrderLineRequest as SdkOrderLineRequest, OrderStatus as SdkOrderStatus,
};
use rust_decimal::Decimal;

/// Terminal order status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `boxoffice_sdk::objects::OrderStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "order_status")]
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

impl From<OrderStatus> for SdkOrderStatus {
    fn from(value: OrderStatus) -> Self {
        match value {
            OrderStatus::Success => SdkOrderStatus::Success,
            OrderStatus::EventNotFound => SdkOrderStatus::EventNotFound,
            OrderStatus::UserNotFound => SdkOrderStatus::UserNotFound,
            OrderStatus::LineNotFound => SdkOrderStatus::LineNotFound,
            OrderStatus::InsufficientStock => SdkOrderStatus::InsufficientStock,
            OrderStatus::InsufficientBalance => SdkOrderStatus::InsufficientBalance,
            OrderStatus::DeadlineExceeded => SdkOrderStatus::DeadlineExceeded,
            OrderStatus::InvalidRequest => SdkOrderStatus::InvalidRequest,
            OrderStatus::StorageFault => SdkOrderStatus::StorageFault,
        }
    }
}

impl From<SdkOrderStatus> for OrderStatus {
    fn from(value: SdkOrderStatus) -> Self {
        match value {
            SdkOrderStatus::Success => OrderStatus::Success,
            SdkOrderStatus::EventNotFound => OrderStatus::EventNotFound,
            SdkOrderStatus::UserNotFound => OrderStatus::UserNotFound,
            SdkOrderStatus::LineNotFound => OrderStatus::LineNotFound,
            SdkOrderStatus::InsufficientStock => OrderStatus::InsufficientStock,
            SdkOrderStatus::InsufficientBalance => OrderStatus::InsufficientBalance,
            SdkOrderStatus::DeadlineExceeded => OrderStatus::DeadlineExceeded,
            SdkOrderStatus::InvalidRequest => OrderStatus::InvalidRequest,
            SdkOrderStatus::StorageFault => OrderStatus::StorageFault,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkOrderStatus::from(*self).fmt(f)
    }
}

/// Progress of one purchase attempt through the order protocol.
///
/// The protocol is a single linear pass; any failure exits to a terminal
/// [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderPhase {
    Started,
    EventResolved,
    Priced,
    FundsReserved,
    StockReserved,
    Success,
}

impl std::fmt::Display for OrderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderPhase::Started => "started",
            OrderPhase::EventResolved => "event_resolved",
            OrderPhase::Priced => "priced",
            OrderPhase::FundsReserved => "funds_reserved",
            OrderPhase::StockReserved => "stock_reserved",
            OrderPhase::Success => "success",
        };
        f.write_str(s)
    }
}

/// A requested ticket line, matched by id first and label second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub ticket_class_id: Option<TicketClassId>,
    pub label: Option<String>,
    pub quantity: u32,
}

impl OrderLineRequest {
    pub fn by_id(ticket_class_id: TicketClassId, quantity: u32) -> Self {
        Self {
            ticket_class_id: Some(ticket_class_id),
            label: None,
            quantity,
        }
    }

    pub fn by_label(label: impl Into<String>, quantity: u32) -> Self {
        Self {
            ticket_class_id: None,
            label: Some(label.into()),
            quantity,
        }
    }

    /// Human readable description of what this line asks for.
    pub fn selector(&self) -> String {
        match (&self.ticket_class_id, &self.label) {
            (Some(id), Some(label)) => format!("id {id} / label {label:?}"),
            (Some(id), None) => format!("id {id}"),
            (None, Some(label)) => format!("label {label:?}"),
            (None, None) => "<empty selector>".to_string(),
        }
    }
}

impl From<SdkOrderLineRequest> for OrderLineRequest {
    fn from(value: SdkOrderLineRequest) -> Self {
        Self {
            ticket_class_id: value.ticket_class_id.map(TicketClassId),
            label: value.label,
            quantity: value.quantity,
        }
    }
}

/// A requested line resolved against the catalog, with its canonical label
/// and the unit price it is sold at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub ticket_class_id: TicketClassId,
    pub label: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl ResolvedLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order outcome that has not been written to the journal yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub created_at: time::OffsetDateTime,
    pub buyer_id: UserId,
    /// `None` when the buyer could not be resolved.
    pub buyer_name: Option<String>,
    pub event_id: EventId,
    /// `None` when the event could not be resolved.
    pub event: Option<EventSnapshot>,
    pub lines: Vec<ResolvedLine>,
    pub total_price: Decimal,
    pub payment_method: String,
    pub status: OrderStatus,
}

impl NewOrder {
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            created_at: self.created_at,
            buyer_id: self.buyer_id,
            buyer_name: self.buyer_name,
            event_id: self.event_id,
            event: self.event,
            lines: self.lines,
            total_price: self.total_price,
            payment_method: self.payment_method,
            status: self.status,
        }
    }
}

/// Immutable journal entry describing the final outcome of one purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub created_at: time::OffsetDateTime,
    pub buyer_id: UserId,
    pub buyer_name: Option<String>,
    pub event_id: EventId,
    pub event: Option<EventSnapshot>,
    pub lines: Vec<ResolvedLine>,
    pub total_price: Decimal,
    pub payment_method: String,
    pub status: OrderStatus,
}

impl Order {
    /// Sum of `unit_price * quantity` over the lines.
    pub fn lines_total(&self) -> Decimal {
        self.lines.iter().map(ResolvedLine::line_total).sum()
    }

    pub fn is_success(&self) -> bool {
        self.status == OrderStatus::Success
    }
}
