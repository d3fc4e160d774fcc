use super::{EventCatalog, ReserveError, plan_reservation};
use crate::entities::event::{Event, TicketClass};
use crate::entities::order::{OrderLineRequest, ResolvedLine};
use crate::entities::{EventId, TicketClassId};
use crate::framework::{DatabaseProcessor, StorageError};
use async_trait::async_trait;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, sqlx::FromRow)]
struct EventRow {
    id: EventId,
    name: String,
    date: time::PrimitiveDateTime,
    location: String,
    description: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TicketClassRow {
    id: TicketClassId,
    event_id: EventId,
    label: String,
    unit_price: Decimal,
    stock: i64,
}

impl TryFrom<TicketClassRow> for TicketClass {
    type Error = StorageError;

    fn try_from(row: TicketClassRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| {
            StorageError::Corrupt(format!(
                "ticket class {} has out of range stock {}",
                row.id, row.stock
            ))
        })?;
        Ok(TicketClass {
            id: row.id,
            label: row.label,
            unit_price: row.unit_price,
            stock,
        })
    }
}

fn assemble(event: EventRow, classes: Vec<TicketClassRow>) -> Result<Event, StorageError> {
    let ticket_classes = classes
        .into_iter()
        .filter(|c| c.event_id == event.id)
        .map(TicketClass::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Event {
        id: event.id,
        name: event.name,
        date: event.date,
        location: event.location,
        description: event.description,
        ticket_classes,
    })
}

#[derive(Debug, Clone)]
pub struct GetEventById {
    pub id: EventId,
}

impl Processor<GetEventById> for DatabaseProcessor {
    type Output = Option<Event>;
    type Error = StorageError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetEventById")]
    async fn process(&self, query: GetEventById) -> Result<Option<Event>, StorageError> {
        let event: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, date, location, description
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(query.id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(event) = event else {
            return Ok(None);
        };
        let classes: Vec<TicketClassRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, label, unit_price, stock
            FROM ticket_classes
            WHERE event_id = $1
            ORDER BY id
            "#,
        )
        .bind(event.id)
        .fetch_all(&self.pool)
        .await?;
        assemble(event, classes).map(Some)
    }
}

#[derive(Debug, Clone)]
pub struct GetEventByName {
    pub name: String,
}

impl Processor<GetEventByName> for DatabaseProcessor {
    type Output = Option<Event>;
    type Error = StorageError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetEventByName")]
    async fn process(&self, query: GetEventByName) -> Result<Option<Event>, StorageError> {
        let id: Option<EventId> = sqlx::query_scalar(
            r#"
            SELECT id FROM events
            WHERE name = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(query.name)
        .fetch_optional(&self.pool)
        .await?;
        match id {
            Some(id) => self.process(GetEventById { id }).await,
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListEvents;

impl Processor<ListEvents> for DatabaseProcessor {
    type Output = Vec<Event>;
    type Error = StorageError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListEvents")]
    async fn process(&self, _query: ListEvents) -> Result<Vec<Event>, StorageError> {
        let events: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, date, location, description
            FROM events
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let classes: Vec<TicketClassRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, label, unit_price, stock
            FROM ticket_classes
            ORDER BY event_id, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let mut by_event: BTreeMap<EventId, Vec<TicketClassRow>> = BTreeMap::new();
        for class in classes {
            by_event.entry(class.event_id).or_default().push(class);
        }
        events
            .into_iter()
            .map(|event| {
                let classes = by_event.remove(&event.id).unwrap_or_default();
                assemble(event, classes)
            })
            .collect()
    }
}

/// Check and decrement stock for an event inside one short transaction.
#[derive(Debug, Clone)]
pub struct ReserveTickets {
    pub event_id: EventId,
    pub lines: Vec<OrderLineRequest>,
}

impl Processor<ReserveTickets> for DatabaseProcessor {
    type Output = Vec<ResolvedLine>;
    type Error = ReserveError;
    #[tracing::instrument(skip_all, err, name = "SQL:ReserveTickets")]
    async fn process(&self, cmd: ReserveTickets) -> Result<Vec<ResolvedLine>, ReserveError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<EventId> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1")
            .bind(cmd.event_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(ReserveError::EventNotFound);
        }

        // Row locks make the check and the decrement one critical section
        // per event; concurrent reservations for the same event queue here.
        let rows: Vec<TicketClassRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, label, unit_price, stock
            FROM ticket_classes
            WHERE event_id = $1
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(cmd.event_id)
        .fetch_all(&mut *tx)
        .await?;
        let classes = rows
            .into_iter()
            .map(TicketClass::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let plan = plan_reservation(&classes, &cmd.lines)?;
        for (idx, quantity) in &plan.decrements {
            sqlx::query("UPDATE ticket_classes SET stock = stock - $2 WHERE id = $1")
                .bind(classes[*idx].id)
                .bind(i64::from(*quantity))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(plan.resolved)
    }
}

/// Postgres-backed [`EventCatalog`].
#[derive(Clone)]
pub struct PgEventCatalog {
    db: DatabaseProcessor,
}

impl PgEventCatalog {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventCatalog for PgEventCatalog {
    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        self.db.process(GetEventById { id }).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Event>, StorageError> {
        self.db
            .process(GetEventByName {
                name: name.to_string(),
            })
            .await
    }

    async fn list(&self) -> Result<Vec<Event>, StorageError> {
        self.db.process(ListEvents).await
    }

    async fn reserve(
        &self,
        event_id: EventId,
        lines: &[OrderLineRequest],
    ) -> Result<Vec<ResolvedLine>, ReserveError> {
        self.db
            .process(ReserveTickets {
                event_id,
                lines: lines.to_vec(),
            })
            .await
    }
}
