use super::OrderJournal;
use crate::entities::order::{NewOrder, Order};
use crate::entities::{OrderId, UserId};
use crate::framework::StorageError;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Order journal held in process memory. Order `n` lives at index `n - 1`.
#[derive(Default)]
pub struct InMemoryOrderJournal {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderJournal for InMemoryOrderJournal {
    async fn record(&self, order: NewOrder) -> Result<Order, StorageError> {
        let mut orders = self.orders.write().await;
        let next = i64::try_from(orders.len())
            .map(|len| len + 1)
            .map_err(|_| StorageError::Unavailable("order journal is full".to_string()))?;
        let order = order.into_order(OrderId(next));
        orders.push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StorageError> {
        let Some(index) = id.0.checked_sub(1).and_then(|i| usize::try_from(i).ok()) else {
            return Ok(None);
        };
        Ok(self.orders.read().await.get(index).cloned())
    }

    async fn find_all_by_user(&self, buyer_id: UserId) -> Result<Vec<Order>, StorageError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Order>, StorageError> {
        Ok(self.orders.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EventId;
    use crate::entities::order::OrderStatus;
    use rust_decimal::Decimal;

    fn failed_order(buyer: i64) -> NewOrder {
        NewOrder {
            created_at: time::OffsetDateTime::now_utc(),
            buyer_id: UserId(buyer),
            buyer_name: None,
            event_id: EventId(1),
            event: None,
            lines: Vec::new(),
            total_price: Decimal::ZERO,
            payment_method: "-".to_string(),
            status: OrderStatus::UserNotFound,
        }
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_from_one() {
        let journal = InMemoryOrderJournal::new();
        let a = journal.record(failed_order(1)).await.unwrap();
        let b = journal.record(failed_order(2)).await.unwrap();
        assert_eq!(a.id, OrderId(1));
        assert_eq!(b.id, OrderId(2));
        assert_eq!(journal.find_by_id(OrderId(2)).await.unwrap(), Some(b));
        assert_eq!(journal.find_by_id(OrderId(0)).await.unwrap(), None);
        assert_eq!(journal.find_by_id(OrderId(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_all_by_user() {
        let journal = InMemoryOrderJournal::new();
        journal.record(failed_order(1)).await.unwrap();
        journal.record(failed_order(2)).await.unwrap();
        journal.record(failed_order(1)).await.unwrap();
        let mine = journal.find_all_by_user(UserId(1)).await.unwrap();
        assert_eq!(
            mine.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![OrderId(1), OrderId(3)]
        );
        assert!(journal.find_all_by_user(UserId(7)).await.unwrap().is_empty());
        assert_eq!(journal.find_all().await.unwrap().len(), 3);
    }
}
