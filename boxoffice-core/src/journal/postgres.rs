use super::OrderJournal;
use crate::entities::event::EventSnapshot;
use crate::entities::order::{NewOrder, Order, OrderStatus, ResolvedLine};
use crate::entities::{EventId, OrderId, TicketClassId, UserId};
use crate::framework::{DatabaseProcessor, StorageError};
use async_trait::async_trait;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    created_at: time::OffsetDateTime,
    buyer_id: UserId,
    buyer_name: Option<String>,
    event_id: EventId,
    event_name: Option<String>,
    event_date: Option<time::PrimitiveDateTime>,
    event_location: Option<String>,
    total_price: Decimal,
    payment_method: String,
    status: OrderStatus,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    ticket_class_id: TicketClassId,
    label: String,
    quantity: i64,
    unit_price: Decimal,
}

impl TryFrom<OrderLineRow> for ResolvedLine {
    type Error = StorageError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StorageError::Corrupt(format!(
                "order {} has out of range quantity {}",
                row.order_id, row.quantity
            ))
        })?;
        Ok(ResolvedLine {
            ticket_class_id: row.ticket_class_id,
            label: row.label,
            quantity,
            unit_price: row.unit_price,
        })
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<ResolvedLine>) -> Order {
        let event = match (self.event_name, self.event_date, self.event_location) {
            (Some(name), Some(date), Some(location)) => Some(EventSnapshot {
                name,
                date,
                location,
            }),
            _ => None,
        };
        Order {
            id: self.id,
            created_at: self.created_at,
            buyer_id: self.buyer_id,
            buyer_name: self.buyer_name,
            event_id: self.event_id,
            event,
            lines,
            total_price: self.total_price,
            payment_method: self.payment_method,
            status: self.status,
        }
    }
}

const ORDER_COLUMNS: &str = "id, created_at, buyer_id, buyer_name, event_id, event_name, \
    event_date, event_location, total_price, payment_method, status";

impl DatabaseProcessor {
    async fn attach_lines(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, StorageError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id.0).collect();
        let line_rows: Vec<OrderLineRow> = sqlx::query_as(
            r#"
            SELECT order_id, ticket_class_id, label, quantity, unit_price
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: BTreeMap<OrderId, Vec<ResolvedLine>> = BTreeMap::new();
        for row in line_rows {
            let order_id = row.order_id;
            by_order
                .entry(order_id)
                .or_default()
                .push(ResolvedLine::try_from(row)?);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect())
    }
}

/// Insert an order header and its lines in one transaction.
#[derive(Debug, Clone)]
pub struct InsertOrder {
    pub order: NewOrder,
}

impl Processor<InsertOrder> for DatabaseProcessor {
    type Output = Order;
    type Error = StorageError;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertOrder")]
    async fn process(&self, insert: InsertOrder) -> Result<Order, StorageError> {
        let order = insert.order;
        let (event_name, event_date, event_location) = match &order.event {
            Some(e) => (Some(e.name.clone()), Some(e.date), Some(e.location.clone())),
            None => (None, None, None),
        };

        let mut tx = self.pool.begin().await?;
        let id: OrderId = sqlx::query_scalar(
            r#"
            INSERT INTO orders
                (created_at, buyer_id, buyer_name, event_id, event_name,
                 event_date, event_location, total_price, payment_method, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(order.created_at)
        .bind(order.buyer_id)
        .bind(&order.buyer_name)
        .bind(order.event_id)
        .bind(event_name)
        .bind(event_date)
        .bind(event_location)
        .bind(order.total_price)
        .bind(&order.payment_method)
        .bind(order.status)
        .fetch_one(&mut *tx)
        .await?;

        if !order.lines.is_empty() {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO order_lines \
                (order_id, position, ticket_class_id, label, quantity, unit_price) ",
            );
            query_builder.push_values(order.lines.iter().enumerate(), |mut b, (pos, line)| {
                b.push_bind(id)
                    .push_bind(i32::try_from(pos).unwrap_or(i32::MAX))
                    .push_bind(line.ticket_class_id)
                    .push_bind(line.label.clone())
                    .push_bind(i64::from(line.quantity))
                    .push_bind(line.unit_price);
            });
            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(order.into_order(id))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetOrderById {
    pub id: OrderId,
}

impl Processor<GetOrderById> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = StorageError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderById")]
    async fn process(&self, query: GetOrderById) -> Result<Option<Order>, StorageError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(query.id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.attach_lines(vec![row]).await?.pop())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListOrdersByBuyer {
    pub buyer_id: UserId,
}

impl Processor<ListOrdersByBuyer> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = StorageError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListOrdersByBuyer")]
    async fn process(&self, query: ListOrdersByBuyer) -> Result<Vec<Order>, StorageError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY id"
        ))
        .bind(query.buyer_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_lines(rows).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListOrders;

impl Processor<ListOrders> for DatabaseProcessor {
    type Output = Vec<Order>;
    type Error = StorageError;
    #[tracing::instrument(skip_all, err, name = "SQL:ListOrders")]
    async fn process(&self, _query: ListOrders) -> Result<Vec<Order>, StorageError> {
        let rows: Vec<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        self.attach_lines(rows).await
    }
}

/// Postgres-backed [`OrderJournal`].
#[derive(Clone)]
pub struct PgOrderJournal {
    db: DatabaseProcessor,
}

impl PgOrderJournal {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderJournal for PgOrderJournal {
    async fn record(&self, order: NewOrder) -> Result<Order, StorageError> {
        self.db.process(InsertOrder { order }).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StorageError> {
        self.db.process(GetOrderById { id }).await
    }

    async fn find_all_by_user(&self, buyer_id: UserId) -> Result<Vec<Order>, StorageError> {
        self.db.process(ListOrdersByBuyer { buyer_id }).await
    }

    async fn find_all(&self) -> Result<Vec<Order>, StorageError> {
        self.db.process(ListOrders).await
    }
}
