//! Linked account lookups and bank-side account data.
//!
//! Local records say which accounts a user has linked; balances and
//! transactions are read from Plaid with each record's access token.

use serde::Serialize;
use uuid::Uuid;

use crate::clients::plaid::BankDataProvider;
use crate::error::AppError;
use crate::models::bank_account::{BankAccount, decode_shareable_id};
use crate::models::transaction::{AccountSummary, Transaction};
use crate::models::user::User;
use crate::services::bank_store::BankAccountStore;

/// Totals shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountsOverview {
    pub accounts: Vec<AccountSummary>,
    pub total_banks: usize,
    pub total_current_balance: f64,
}

/// One account with its full transaction sequence, in bank order.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountActivity {
    pub account: AccountSummary,
    pub transactions: Vec<Transaction>,
}

/// Fetch a record owned by `user`. Records owned by someone else are
/// reported as missing.
pub async fn get_owned_bank(
    banks: &dyn BankAccountStore,
    user: &User,
    id: Uuid,
) -> Result<BankAccount, AppError> {
    banks
        .get(id)
        .await?
        .filter(|b| b.user_id == user.user_id)
        .ok_or(AppError::NotFound("Bank account"))
}

/// Resolve a record from its shareable id.
pub async fn get_bank_by_shareable_id(
    banks: &dyn BankAccountStore,
    shareable_id: &str,
) -> Result<BankAccount, AppError> {
    let account_id = decode_shareable_id(shareable_id)
        .ok_or_else(|| AppError::Validation("shareable id is malformed".to_string()))?;

    banks
        .get_by_account_id(&account_id)
        .await?
        .ok_or(AppError::NotFound("Bank account"))
}

/// Join a record with the bank's view of the same account. `Ok(None)` when
/// the bank no longer lists the account.
async fn summarize(
    plaid: &dyn BankDataProvider,
    bank: &BankAccount,
) -> Result<Option<AccountSummary>, AppError> {
    let details = plaid
        .get_accounts(&bank.access_token)
        .await?
        .into_iter()
        .find(|a| a.account_id == bank.account_id);

    Ok(details.map(|details| AccountSummary {
        record_id: bank.id,
        shareable_id: bank.shareable_id.clone(),
        details,
    }))
}

fn not_listed(bank: &BankAccount) -> AppError {
    AppError::upstream(
        "plaid",
        format!("account for bank record {} is no longer listed", bank.id),
    )
}

/// Summaries and totals for `records`. Records the bank no longer lists are
/// left out.
async fn overview_of(
    plaid: &dyn BankDataProvider,
    records: &[BankAccount],
) -> Result<AccountsOverview, AppError> {
    let mut accounts = Vec::with_capacity(records.len());
    for record in records {
        match summarize(plaid, record).await? {
            Some(summary) => accounts.push(summary),
            None => tracing::warn!(
                record_id = %record.id,
                user_id = %record.user_id,
                "linked account no longer listed by bank, skipping"
            ),
        }
    }

    let total_current_balance = accounts
        .iter()
        .filter_map(|a| a.details.current_balance)
        .sum();

    Ok(AccountsOverview {
        total_banks: accounts.len(),
        total_current_balance,
        accounts,
    })
}

/// Summaries and totals for every account `user` has linked.
pub async fn get_accounts(
    plaid: &dyn BankDataProvider,
    banks: &dyn BankAccountStore,
    user: &User,
) -> Result<AccountsOverview, AppError> {
    let records = banks.list_by_user(&user.user_id).await?;

    overview_of(plaid, &records).await
}

/// `bank`'s transactions in bank order.
async fn transactions_for(
    plaid: &dyn BankDataProvider,
    bank: &BankAccount,
) -> Result<Vec<Transaction>, AppError> {
    Ok(plaid
        .get_transactions(&bank.access_token)
        .await?
        .into_iter()
        .filter(|t| t.account_id == bank.account_id)
        .collect())
}

/// Account details and transactions for one linked record.
pub async fn get_account_activity(
    plaid: &dyn BankDataProvider,
    bank: &BankAccount,
) -> Result<AccountActivity, AppError> {
    let account = summarize(plaid, bank).await?.ok_or_else(|| not_listed(bank))?;
    let transactions = transactions_for(plaid, bank).await?;

    Ok(AccountActivity {
        account,
        transactions,
    })
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub overview: AccountsOverview,
    pub activity: Option<AccountActivity>,
}

/// Overview of all linked accounts plus activity for the selected one.
///
/// Records are listed once and each is summarized once; the selected
/// account's summary is taken from the overview. Without `requested` the
/// first record the bank still lists is selected.
pub async fn get_dashboard(
    plaid: &dyn BankDataProvider,
    banks: &dyn BankAccountStore,
    user: &User,
    requested: Option<Uuid>,
) -> Result<Dashboard, AppError> {
    let records = banks.list_by_user(&user.user_id).await?;
    let overview = overview_of(plaid, &records).await?;

    let summary_of = |bank: &BankAccount| {
        overview
            .accounts
            .iter()
            .find(|a| a.record_id == bank.id)
            .cloned()
    };

    let selected = match requested {
        Some(id) => {
            let bank = records
                .iter()
                .find(|r| r.id == id)
                .ok_or(AppError::NotFound("Bank account"))?;
            let account = summary_of(bank).ok_or_else(|| not_listed(bank))?;
            Some((bank, account))
        }
        None => records
            .iter()
            .find_map(|bank| summary_of(bank).map(|account| (bank, account))),
    };

    let activity = match selected {
        Some((bank, account)) => Some(AccountActivity {
            account,
            transactions: transactions_for(plaid, bank).await?,
        }),
        None => None,
    };

    Ok(Dashboard { overview, activity })
}

/// Pick the record a view should show: the requested one if given (and owned
/// by `user`), otherwise the user's first linked record. `Ok(None)` means the
/// user has not linked anything yet.
pub async fn select_bank(
    banks: &dyn BankAccountStore,
    user: &User,
    requested: Option<Uuid>,
) -> Result<Option<BankAccount>, AppError> {
    match requested {
        Some(id) => get_owned_bank(banks, user, id).await.map(Some),
        None => Ok(banks.list_by_user(&user.user_id).await?.into_iter().next()),
    }
}
