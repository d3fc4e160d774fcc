//! Account ledger: balance lookups, atomic debit and credit.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryAccountLedger;
pub use postgres::PgAccountLedger;

use crate::entities::UserId;
use crate::entities::account::Account;
use crate::framework::StorageError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account not found")]
    AccountNotFound,

    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: Decimal, required: Decimal },

    #[error("invalid amount {0}")]
    InvalidAmount(Decimal),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(value: sqlx::Error) -> Self {
        LedgerError::Storage(StorageError::Database(value))
    }
}

/// Owner of account balances.
#[async_trait]
pub trait AccountLedger: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StorageError>;

    /// Subtract `amount` if the balance covers it and return the new balance.
    /// Either the whole amount is taken or nothing is.
    async fn debit(&self, id: UserId, amount: Decimal) -> Result<Decimal, LedgerError>;

    /// Add `amount` and return the new balance.
    async fn credit(&self, id: UserId, amount: Decimal) -> Result<Decimal, LedgerError>;
}

pub(crate) fn check_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}
