//! Bank account record store.
//!
//! Records are written once by the bank-link exchange and read by every
//! dashboard view. "Not found" is `Ok(None)` or an empty list; `Err` is kept
//! for real failures.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::bank_account::{BankAccount, NewBankAccount};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BankAccountStore: Send + Sync {
    /// All records owned by `user_id`, oldest first.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<BankAccount>, AppError>;

    /// The record with this id, if any.
    async fn get(&self, id: Uuid) -> Result<Option<BankAccount>, AppError>;

    /// The record for this Plaid account id, only if exactly one exists.
    async fn get_by_account_id(&self, account_id: &str) -> Result<Option<BankAccount>, AppError>;

    /// Persist a new record. Linking the same account twice for one user is a
    /// `Conflict`.
    async fn insert(&self, record: NewBankAccount) -> Result<BankAccount, AppError>;
}

/// Return the only element of `items`, or `None` if there are zero or several.
pub fn exactly_one<T>(items: Vec<T>) -> Option<T> {
    let mut iter = items.into_iter();
    match (iter.next(), iter.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

pub struct PgBankAccountStore {
    pool: DbPool,
}

impl PgBankAccountStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str =
    "id, user_id, bank_id, account_id, access_token, funding_source_url, shareable_id, created_at";

#[async_trait]
impl BankAccountStore for PgBankAccountStore {
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<BankAccount>, AppError> {
        let records = sqlx::query_as::<_, BankAccount>(&format!(
            "SELECT {COLUMNS} FROM bank_accounts WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get(&self, id: Uuid) -> Result<Option<BankAccount>, AppError> {
        let record = sqlx::query_as::<_, BankAccount>(&format!(
            "SELECT {COLUMNS} FROM bank_accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_by_account_id(&self, account_id: &str) -> Result<Option<BankAccount>, AppError> {
        // Two rows are enough to tell "exactly one" from "several".
        let records = sqlx::query_as::<_, BankAccount>(&format!(
            "SELECT {COLUMNS} FROM bank_accounts WHERE account_id = $1 LIMIT 2"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        if records.len() > 1 {
            tracing::warn!("several bank accounts share one account id");
        }

        Ok(exactly_one(records))
    }

    async fn insert(&self, record: NewBankAccount) -> Result<BankAccount, AppError> {
        let inserted = sqlx::query_as::<_, BankAccount>(&format!(
            r#"
            INSERT INTO bank_accounts
                (user_id, bank_id, account_id, access_token, funding_source_url, shareable_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&record.user_id)
        .bind(&record.bank_id)
        .bind(&record.account_id)
        .bind(&record.access_token)
        .bind(&record.funding_source_url)
        .bind(&record.shareable_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Bank account is already linked".to_string())
            }
            other => AppError::Database(other),
        })?;

        tracing::info!(record_id = %inserted.id, user_id = %inserted.user_id, "bank account stored");

        Ok(inserted)
    }
}
