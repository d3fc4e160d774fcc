use super::order::OrderLineRequest;
use super::{EventId, TicketClassId};
use rust_decimal::Decimal;

/// A priced, finite-stock category of ticket within an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketClass {
    pub id: TicketClassId,
    pub label: String,
    pub unit_price: Decimal,
    pub stock: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub date: time::PrimitiveDateTime,
    pub location: String,
    pub description: String,
    /// Ordered by ticket class id.
    pub ticket_classes: Vec<TicketClass>,
}

/// Event fields copied into an order at purchase time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSnapshot {
    pub name: String,
    pub date: time::PrimitiveDateTime,
    pub location: String,
}

impl Event {
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            name: self.name.clone(),
            date: self.date,
            location: self.location.clone(),
        }
    }

    /// Find the ticket class a requested line refers to.
    pub fn find_ticket_class(&self, line: &OrderLineRequest) -> Option<&TicketClass> {
        match_ticket_class(&self.ticket_classes, line).map(|idx| &self.ticket_classes[idx])
    }
}

/// Index of the ticket class matching `line`.
///
/// The id is tried first. Without an id, or when the id matches nothing, the
/// label is compared exactly. An id that matches wins over a conflicting label.
pub fn match_ticket_class(classes: &[TicketClass], line: &OrderLineRequest) -> Option<usize> {
    if let Some(id) = line.ticket_class_id {
        if let Some(idx) = classes.iter().position(|c| c.id == id) {
            return Some(idx);
        }
    }
    let label = line.label.as_deref()?;
    classes.iter().position(|c| c.label == label)
}

/// Data for inserting a new ticket class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicketClass {
    pub label: String,
    pub unit_price: Decimal,
    pub stock: u32,
}

/// Data for inserting a new event with its ticket classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub name: String,
    pub date: time::PrimitiveDateTime,
    pub location: String,
    pub description: String,
    pub ticket_classes: Vec<NewTicketClass>,
}
