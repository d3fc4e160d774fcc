use super::{AccountLedger, LedgerError, check_amount};
use crate::entities::UserId;
use crate::entities::account::Account;
use crate::framework::{DatabaseProcessor, StorageError};
use async_trait::async_trait;
use kanau::processor::Processor;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub struct GetAccountById {
    pub id: UserId,
}

impl Processor<GetAccountById> for DatabaseProcessor {
    type Output = Option<Account>;
    type Error = StorageError;
    #[tracing::instrument(skip_all, err, name = "SQL:GetAccountById")]
    async fn process(&self, query: GetAccountById) -> Result<Option<Account>, StorageError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, balance
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(query.id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }
}

/// Conditional debit. The guard in the `WHERE` clause makes the balance
/// check and the subtraction a single statement.
#[derive(Debug, Clone, Copy)]
pub struct DebitAccount {
    pub id: UserId,
    pub amount: Decimal,
}

impl Processor<DebitAccount> for DatabaseProcessor {
    type Output = Decimal;
    type Error = LedgerError;
    #[tracing::instrument(skip_all, err, name = "SQL:DebitAccount")]
    async fn process(&self, cmd: DebitAccount) -> Result<Decimal, LedgerError> {
        check_amount(cmd.amount)?;
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance - $2
            WHERE id = $1 AND balance >= $2
            RETURNING balance
            "#,
        )
        .bind(cmd.id)
        .bind(cmd.amount)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(balance) = balance {
            return Ok(balance);
        }

        // Nothing updated: either the account is missing or it cannot cover
        // the amount.
        let current: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
                .bind(cmd.id)
                .fetch_optional(&self.pool)
                .await?;
        match current {
            Some(balance) => Err(LedgerError::InsufficientBalance {
                balance,
                required: cmd.amount,
            }),
            None => Err(LedgerError::AccountNotFound),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CreditAccount {
    pub id: UserId,
    pub amount: Decimal,
}

impl Processor<CreditAccount> for DatabaseProcessor {
    type Output = Decimal;
    type Error = LedgerError;
    #[tracing::instrument(skip_all, err, name = "SQL:CreditAccount")]
    async fn process(&self, cmd: CreditAccount) -> Result<Decimal, LedgerError> {
        check_amount(cmd.amount)?;
        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET balance = balance + $2
            WHERE id = $1
            RETURNING balance
            "#,
        )
        .bind(cmd.id)
        .bind(cmd.amount)
        .fetch_optional(&self.pool)
        .await?;
        balance.ok_or(LedgerError::AccountNotFound)
    }
}

/// Postgres-backed [`AccountLedger`].
#[derive(Clone)]
pub struct PgAccountLedger {
    db: DatabaseProcessor,
}

impl PgAccountLedger {
    pub fn new(db: DatabaseProcessor) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountLedger for PgAccountLedger {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StorageError> {
        self.db.process(GetAccountById { id }).await
    }

    async fn debit(&self, id: UserId, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.db.process(DebitAccount { id, amount }).await
    }

    async fn credit(&self, id: UserId, amount: Decimal) -> Result<Decimal, LedgerError> {
        self.db.process(CreditAccount { id, amount }).await
    }
}
