use super::{AccountLedger, LedgerError, check_amount};
use crate::entities::UserId;
use crate::entities::account::{Account, NewAccount};
use crate::framework::StorageError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Account ledger held in process memory, one mutex per account.
pub struct InMemoryAccountLedger {
    accounts: RwLock<BTreeMap<UserId, Arc<Mutex<Account>>>>,
    next_id: AtomicI64,
}

impl Default for InMemoryAccountLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountLedger {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn insert(&self, new_account: NewAccount) -> Account {
        let account = Account {
            id: UserId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            name: new_account.name,
            balance: new_account.balance,
        };
        self.accounts
            .write()
            .await
            .insert(account.id, Arc::new(Mutex::new(account.clone())));
        account
    }

    async fn entry(&self, id: UserId) -> Option<Arc<Mutex<Account>>> {
        self.accounts.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl AccountLedger for InMemoryAccountLedger {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StorageError> {
        let Some(entry) = self.entry(id).await else {
            return Ok(None);
        };
        let account = entry.lock().await.clone();
        Ok(Some(account))
    }

    async fn debit(&self, id: UserId, amount: Decimal) -> Result<Decimal, LedgerError> {
        check_amount(amount)?;
        let entry = self.entry(id).await.ok_or(LedgerError::AccountNotFound)?;
        let mut account = entry.lock().await;
        if account.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                balance: account.balance,
                required: amount,
            });
        }
        account.balance -= amount;
        Ok(account.balance)
    }

    async fn credit(&self, id: UserId, amount: Decimal) -> Result<Decimal, LedgerError> {
        check_amount(amount)?;
        let entry = self.entry(id).await.ok_or(LedgerError::AccountNotFound)?;
        let mut account = entry.lock().await;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;
        Ok(account.balance)
    }
}
