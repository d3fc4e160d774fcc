use super::UserId;
use rust_decimal::Decimal;

/// A buyer and their spendable balance. The balance never goes negative.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Account {
    pub id: UserId,
    pub name: String,
    pub balance: Decimal,
}

/// Data for inserting a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub balance: Decimal,
}
