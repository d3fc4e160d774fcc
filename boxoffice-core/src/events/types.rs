use crate::entities::order::OrderStatus;
use crate::entities::{OrderId, UserId};
use rust_decimal::Decimal;

/// A debit that could not be credited back inline.
///
/// Until it is resolved the buyer has paid for an order that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationRequired {
    /// The failed order. [`OrderId::UNRECORDED`] if the journal write failed too.
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub amount: Decimal,
    /// Why the order failed after the debit.
    pub cause: OrderStatus,
}
