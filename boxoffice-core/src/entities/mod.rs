pub mod account;
pub mod event;
pub mod order;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Identifier of an [`event::Event`].
    EventId
);
entity_id!(
    /// Identifier of a [`event::TicketClass`], unique across all events.
    TicketClassId
);
entity_id!(
    /// Identifier of a buyer account.
    UserId
);
entity_id!(
    /// Journal-assigned order identifier. Ids start at 1.
    OrderId
);

impl OrderId {
    /// Marks an order the journal failed to persist.
    pub const UNRECORDED: OrderId = OrderId(0);

    pub fn is_recorded(self) -> bool {
        self != Self::UNRECORDED
    }
}
