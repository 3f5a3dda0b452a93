//! Linked account and transaction view handlers.
//!
//! - GET /api/v1/banks - Linked bank records of the signed-in user
//! - GET /api/v1/banks/{id} - One linked record
//! - GET /api/v1/banks/shared/{shareable_id} - Resolve a shareable id
//! - GET /api/v1/dashboard - Balances plus a page of recent transactions
//! - GET /api/v1/transaction-history - A page of one account's transactions

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        bank_account::{BankAccountResponse, SharedBankResponse},
        transaction::{AccountSummary, Transaction},
        user::User,
    },
    pagination::{PAGE_SIZE, Page, paginate},
    services::account_service::{self, AccountActivity, AccountsOverview},
    state::AppState,
};

/// Query parameters shared by the dashboard and transaction history.
///
/// - `id`: bank record to show, defaults to the first linked record
/// - `page`: 1-based page number, defaults to 1 when absent or not a
///   positive integer
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub id: Option<String>,
    pub page: Option<String>,
}

impl ViewQuery {
    pub fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    pub fn record_id(&self) -> Result<Option<Uuid>, AppError> {
        match self.id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| AppError::Validation("id must be a bank account id".to_string())),
        }
    }
}

pub async fn list_banks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<BankAccountResponse>>, AppError> {
    let banks = state.banks.list_by_user(&auth.user.user_id).await?;

    Ok(Json(banks.into_iter().map(Into::into).collect()))
}

/// Returns 404 if the record doesn't exist or belongs to another user.
pub async fn get_bank(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<BankAccountResponse>, AppError> {
    let bank = account_service::get_owned_bank(state.banks.as_ref(), &auth.user, id).await?;

    Ok(Json(bank.into()))
}

/// Resolve a record from the shareable id handed out in links.
///
/// The record may belong to another user, so only the shared view is
/// returned.
pub async fn get_shared_bank(
    State(state): State<AppState>,
    Path(shareable_id): Path<String>,
) -> Result<Json<SharedBankResponse>, AppError> {
    let bank = account_service::get_bank_by_shareable_id(state.banks.as_ref(), &shareable_id).await?;

    Ok(Json(bank.into()))
}

/// Load the selected record's activity, if the user has linked anything.
async fn selected_activity(
    state: &AppState,
    user: &User,
    query: &ViewQuery,
) -> Result<Option<AccountActivity>, AppError> {
    let requested = query.record_id()?;

    match account_service::select_bank(state.banks.as_ref(), user, requested).await? {
        Some(bank) => Ok(Some(
            account_service::get_account_activity(state.plaid.as_ref(), &bank).await?,
        )),
        None => Ok(None),
    }
}

fn transactions_of(activity: Option<&AccountActivity>) -> &[Transaction] {
    activity.map(|a| a.transactions.as_slice()).unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct TransactionHistoryResponse<'a> {
    pub account: Option<&'a AccountSummary>,
    pub transactions: Page<'a, Transaction>,
}

/// One page of the selected account's transactions.
///
/// # Response
///
/// ```json
/// {
///   "account": { "record_id": "...", "name": "Plaid Checking", "current_balance": 110.0, ... },
///   "transactions": {
///     "page": 2, "page_size": 10, "total_pages": 3, "total_items": 23,
///     "items": [ ... ]
///   }
/// }
/// ```
///
/// A user without linked accounts gets `"account": null` and an empty page.
pub async fn transaction_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, AppError> {
    let activity = selected_activity(&state, &auth.user, &query).await?;

    Ok(Json(TransactionHistoryResponse {
        account: activity.as_ref().map(|a| &a.account),
        transactions: paginate(transactions_of(activity.as_ref()), query.page(), PAGE_SIZE),
    })
    .into_response())
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse<'a> {
    pub user: &'a User,
    pub overview: &'a AccountsOverview,
    pub selected: Option<&'a AccountSummary>,
    pub recent_transactions: Page<'a, Transaction>,
}

/// Balances for every linked account plus a page of recent transactions
/// for the selected one.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ViewQuery>,
) -> Result<Response, AppError> {
    let requested = query.record_id()?;
    let dashboard = account_service::get_dashboard(
        state.plaid.as_ref(),
        state.banks.as_ref(),
        &auth.user,
        requested,
    )
    .await?;
    let activity = dashboard.activity.as_ref();

    Ok(Json(DashboardResponse {
        user: &auth.user,
        overview: &dashboard.overview,
        selected: activity.map(|a| &a.account),
        recent_transactions: paginate(transactions_of(activity), query.page(), PAGE_SIZE),
    })
    .into_response())
}
