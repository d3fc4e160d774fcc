//! Append-only order journal.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryOrderJournal;
pub use postgres::PgOrderJournal;

use crate::entities::order::{NewOrder, Order};
use crate::entities::{OrderId, UserId};
use crate::framework::StorageError;
use async_trait::async_trait;

#[async_trait]
pub trait OrderJournal: Send + Sync {
    /// Append an order, assigning the next id. Ids increase monotonically.
    async fn record(&self, order: NewOrder) -> Result<Order, StorageError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StorageError>;

    /// Orders placed by `buyer_id`, oldest first. Empty for an unknown user.
    async fn find_all_by_user(&self, buyer_id: UserId) -> Result<Vec<Order>, StorageError>;

    async fn find_all(&self) -> Result<Vec<Order>, StorageError>;
}
