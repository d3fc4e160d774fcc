//! Event catalog: event lookups and atomic ticket reservation.
//!
//! [`EventCatalog::reserve`] is the only operation that mutates ticket stock.
//! Both backends run the same [`plan_reservation`] check inside their
//! per-event critical section (a `Mutex` for the in-memory store, row locks
//! for Postgres) and only then apply the decrements.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryEventCatalog;
pub use postgres::PgEventCatalog;

use crate::entities::event::{Event, TicketClass, match_ticket_class};
use crate::entities::order::{OrderLineRequest, ResolvedLine};
use crate::entities::{EventId, TicketClassId};
use crate::framework::StorageError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReserveError {
    #[error("event not found")]
    EventNotFound,

    /// Carries the selector of the line that matched nothing.
    #[error("ticket class not found: {0}")]
    TicketClassNotFound(String),

    #[error(
        "insufficient stock for {label} (ticket class {ticket_class_id}): requested {requested}, available {available}"
    )]
    InsufficientStock {
        ticket_class_id: TicketClassId,
        label: String,
        requested: u64,
        available: u32,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for ReserveError {
    fn from(value: sqlx::Error) -> Self {
        ReserveError::Storage(StorageError::Database(value))
    }
}

/// Owner of event and ticket class state.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, StorageError>;

    /// Exact name match. When several events share a name the lowest id wins.
    async fn find_by_name(&self, name: &str) -> Result<Option<Event>, StorageError>;

    /// All events ordered by id.
    async fn list(&self) -> Result<Vec<Event>, StorageError>;

    /// Check and decrement stock for every line as one indivisible unit.
    ///
    /// On any error no stock is changed. The returned lines carry the
    /// canonical label and the unit price at the time of reservation, in
    /// request order.
    async fn reserve(
        &self,
        event_id: EventId,
        lines: &[OrderLineRequest],
    ) -> Result<Vec<ResolvedLine>, ReserveError>;
}

/// The validated effect of a reservation, before it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationPlan {
    pub resolved: Vec<ResolvedLine>,
    /// Total quantity to take from each ticket class, keyed by index into
    /// the class slice the plan was built from.
    pub decrements: Vec<(usize, u32)>,
}

/// Match every line and verify stock for the request as a whole.
///
/// Lines naming the same ticket class are summed before comparing against
/// stock, so two lines of 1 against a stock of 1 fail together.
pub fn plan_reservation(
    classes: &[TicketClass],
    lines: &[OrderLineRequest],
) -> Result<ReservationPlan, ReserveError> {
    let mut resolved = Vec::with_capacity(lines.len());
    let mut demand: BTreeMap<usize, u64> = BTreeMap::new();

    for line in lines {
        let idx = match_ticket_class(classes, line)
            .ok_or_else(|| ReserveError::TicketClassNotFound(line.selector()))?;
        let class = &classes[idx];
        *demand.entry(idx).or_default() += u64::from(line.quantity);
        resolved.push(ResolvedLine {
            ticket_class_id: class.id,
            label: class.label.clone(),
            quantity: line.quantity,
            unit_price: class.unit_price,
        });
    }

    let mut decrements = Vec::with_capacity(demand.len());
    for (idx, requested) in demand {
        let class = &classes[idx];
        if requested > u64::from(class.stock) {
            return Err(ReserveError::InsufficientStock {
                ticket_class_id: class.id,
                label: class.label.clone(),
                requested,
                available: class.stock,
            });
        }
        // bounded by stock above
        let quantity = u32::try_from(requested).unwrap_or(class.stock);
        decrements.push((idx, quantity));
    }

    Ok(ReservationPlan {
        resolved,
        decrements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn classes() -> Vec<TicketClass> {
        vec![
            TicketClass {
                id: TicketClassId(10),
                label: "VIP".to_string(),
                unit_price: Decimal::from(100),
                stock: 2,
            },
            TicketClass {
                id: TicketClassId(11),
                label: "CAT 1".to_string(),
                unit_price: Decimal::from(40),
                stock: 1,
            },
        ]
    }

    #[test]
    fn test_plan_resolves_canonical_lines() {
        let plan = plan_reservation(
            &classes(),
            &[
                OrderLineRequest::by_label("CAT 1", 1),
                OrderLineRequest::by_id(TicketClassId(10), 2),
            ],
        )
        .unwrap();
        assert_eq!(plan.resolved.len(), 2);
        assert_eq!(plan.resolved[0].ticket_class_id, TicketClassId(11));
        assert_eq!(plan.resolved[1].label, "VIP");
        assert_eq!(plan.resolved[1].unit_price, Decimal::from(100));
        assert_eq!(plan.decrements, vec![(0, 2), (1, 1)]);
    }

    #[test]
    fn test_plan_is_all_or_nothing() {
        let err = plan_reservation(
            &classes(),
            &[
                OrderLineRequest::by_label("VIP", 1),
                OrderLineRequest::by_label("CAT 1", 2),
            ],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReserveError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_plan_aggregates_duplicate_lines() {
        let err = plan_reservation(
            &classes(),
            &[
                OrderLineRequest::by_label("CAT 1", 1),
                OrderLineRequest::by_id(TicketClassId(11), 1),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ReserveError::InsufficientStock { .. }));
    }

    #[test]
    fn test_plan_unknown_line() {
        let err = plan_reservation(&classes(), &[OrderLineRequest::by_label("Balcony", 1)])
            .unwrap_err();
        assert!(matches!(err, ReserveError::TicketClassNotFound(s) if s.contains("Balcony")));
    }
}
