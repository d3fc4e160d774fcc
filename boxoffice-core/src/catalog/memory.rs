use super::{EventCatalog, ReserveError, plan_reservation};
use crate::entities::event::{Event, NewEvent, TicketClass};
use crate::entities::order::{OrderLineRequest, ResolvedLine};
use crate::entities::{EventId, TicketClassId};
use crate::framework::StorageError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Event catalog held in process memory.
///
/// The map lock is only taken to find an event; stock checks and
/// decrements run under that event's own mutex, so reservations for
/// different events never contend.
pub struct InMemoryEventCatalog {
    events: RwLock<BTreeMap<EventId, Arc<Mutex<Event>>>>,
    next_event_id: AtomicI64,
    next_ticket_class_id: AtomicI64,
}

impl Default for InMemoryEventCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventCatalog {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(BTreeMap::new()),
            next_event_id: AtomicI64::new(1),
            next_ticket_class_id: AtomicI64::new(1),
        }
    }

    /// Add an event, assigning ids to it and its ticket classes.
    pub async fn insert(&self, new_event: NewEvent) -> Event {
        let id = EventId(self.next_event_id.fetch_add(1, Ordering::Relaxed));
        let ticket_classes = new_event
            .ticket_classes
            .into_iter()
            .map(|class| TicketClass {
                id: TicketClassId(self.next_ticket_class_id.fetch_add(1, Ordering::Relaxed)),
                label: class.label,
                unit_price: class.unit_price,
                stock: class.stock,
            })
            .collect();
        let event = Event {
            id,
            name: new_event.name,
            date: new_event.date,
            location: new_event.location,
            description: new_event.description,
            ticket_classes,
        };
        self.events
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(event.clone())));
        event
    }

    async fn entry(&self, id: EventId) -> Option<Arc<Mutex<Event>>> {
        self.events.read().await.get(&id).cloned()
    }

    async fn entries(&self) -> Vec<Arc<Mutex<Event>>> {
        self.events.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl EventCatalog for InMemoryEventCatalog {
    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        let Some(entry) = self.entry(id).await else {
            return Ok(None);
        };
        let event = entry.lock().await.clone();
        Ok(Some(event))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Event>, StorageError> {
        for entry in self.entries().await {
            let event = entry.lock().await;
            if event.name == name {
                return Ok(Some(event.clone()));
            }
        }
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<Event>, StorageError> {
        let mut events = Vec::new();
        for entry in self.entries().await {
            events.push(entry.lock().await.clone());
        }
        Ok(events)
    }

    async fn reserve(
        &self,
        event_id: EventId,
        lines: &[OrderLineRequest],
    ) -> Result<Vec<ResolvedLine>, ReserveError> {
        let entry = self
            .entry(event_id)
            .await
            .ok_or(ReserveError::EventNotFound)?;
        let mut event = entry.lock().await;
        let plan = plan_reservation(&event.ticket_classes, lines)?;
        for (idx, quantity) in plan.decrements {
            let class = &mut event.ticket_classes[idx];
            class.stock -= quantity;
        }
        Ok(plan.resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::event::NewTicketClass;
    use rust_decimal::Decimal;

    fn concert() -> NewEvent {
        NewEvent {
            name: "Spring Concert".to_string(),
            date: time::macros::datetime!(2026-05-01 19:00),
            location: "Main Hall".to_string(),
            description: "Annual concert".to_string(),
            ticket_classes: vec![
                NewTicketClass {
                    label: "VIP".to_string(),
                    unit_price: Decimal::from(100),
                    stock: 2,
                },
                NewTicketClass {
                    label: "CAT 1".to_string(),
                    unit_price: Decimal::from(50),
                    stock: 5,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let catalog = InMemoryEventCatalog::new();
        let first = catalog.insert(concert()).await;
        let second = catalog.insert(concert()).await;
        assert_eq!(first.id, EventId(1));
        assert_eq!(second.id, EventId(2));
        assert_eq!(first.ticket_classes[0].id, TicketClassId(1));
        assert_eq!(second.ticket_classes[1].id, TicketClassId(4));
    }

    #[tokio::test]
    async fn test_find_by_name_prefers_lowest_id() {
        let catalog = InMemoryEventCatalog::new();
        catalog.insert(concert()).await;
        catalog.insert(concert()).await;
        let found = catalog.find_by_name("Spring Concert").await.unwrap();
        assert_eq!(found.map(|e| e.id), Some(EventId(1)));
        assert!(catalog.find_by_name("Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserve_decrements_stock() {
        let catalog = InMemoryEventCatalog::new();
        let event = catalog.insert(concert()).await;
        let lines = catalog
            .reserve(
                event.id,
                &[
                    OrderLineRequest::by_label("VIP", 2),
                    OrderLineRequest::by_label("CAT 1", 1),
                ],
            )
            .await
            .unwrap();
        assert_eq!(lines.len(), 2);
        let after = catalog.find_by_id(event.id).await.unwrap().unwrap();
        assert_eq!(after.ticket_classes[0].stock, 0);
        assert_eq!(after.ticket_classes[1].stock, 4);
    }

    #[tokio::test]
    async fn test_failed_reserve_changes_nothing() {
        let catalog = InMemoryEventCatalog::new();
        let event = catalog.insert(concert()).await;
        let err = catalog
            .reserve(
                event.id,
                &[
                    OrderLineRequest::by_label("CAT 1", 1),
                    OrderLineRequest::by_label("VIP", 3),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReserveError::InsufficientStock { .. }));
        let after = catalog.find_by_id(event.id).await.unwrap().unwrap();
        assert_eq!(after, event);
    }

    #[tokio::test]
    async fn test_reserve_unknown_event() {
        let catalog = InMemoryEventCatalog::new();
        let err = catalog
            .reserve(EventId(42), &[OrderLineRequest::by_label("VIP", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ReserveError::EventNotFound));
    }
}
