//! Bank-link exchange.
//!
//! When a user completes the Plaid Link widget the browser receives a
//! short-lived public token. Turning that into a usable bank account takes a
//! fixed sequence of upstream calls, each consuming the previous one's
//! output:
//!
//! 1. exchange the public token for an access token and item id
//! 2. fetch the item's accounts and take the first
//! 3. mint a Dwolla processor token for that account
//! 4. register the account as a Dwolla funding source
//! 5. store the bank account record
//!
//! A failure stops the sequence and is returned as-is. Side effects of the
//! steps that already ran are rolled back on a best-effort basis: the Plaid
//! item is removed after a failure in steps 3-5 (revoking the access and
//! processor tokens) and the funding source is removed after a failure in
//! step 5. Rollback failures are logged, never returned.

use crate::clients::dwolla::PaymentsProvider;
use crate::clients::plaid::{BankDataProvider, LinkTokenRequest};
use crate::error::AppError;
use crate::models::bank_account::{BankAccount, NewBankAccount, encode_shareable_id};
use crate::models::user::User;
use crate::services::bank_store::BankAccountStore;

/// Upstream collaborators of the exchange.
pub struct LinkDeps<'a> {
    pub plaid: &'a dyn BankDataProvider,
    pub payments: &'a dyn PaymentsProvider,
    pub banks: &'a dyn BankAccountStore,
}

/// Create a Plaid Link token for `user`.
pub async fn create_link_token(
    plaid: &dyn BankDataProvider,
    user: &User,
) -> Result<String, AppError> {
    plaid
        .create_link_token(LinkTokenRequest {
            client_user_id: user.user_id.clone(),
            client_name: user.full_name(),
        })
        .await
}

/// Side effects created so far, undone in reverse order on failure.
#[derive(Default)]
struct Rollback {
    access_token: Option<String>,
    funding_source_url: Option<String>,
}

impl Rollback {
    async fn run(self, deps: &LinkDeps<'_>) {
        if let Some(url) = &self.funding_source_url {
            match deps.payments.remove_funding_source(url).await {
                Ok(()) => tracing::info!("funding source rolled back"),
                Err(e) => tracing::warn!(error = %e, "failed to roll back funding source"),
            }
        }

        if let Some(token) = &self.access_token {
            match deps.plaid.remove_item(token).await {
                Ok(()) => tracing::info!("plaid item rolled back"),
                Err(e) => tracing::warn!(error = %e, "failed to roll back plaid item"),
            }
        }
    }
}

/// Run the full exchange for `user` and return the stored record.
pub async fn exchange_public_token(
    deps: &LinkDeps<'_>,
    user: &User,
    public_token: &str,
) -> Result<BankAccount, AppError> {
    if public_token.trim().is_empty() {
        return Err(AppError::Validation("public_token is required".to_string()));
    }

    tracing::info!(user_id = %user.user_id, "exchanging public token");
    let exchange = deps.plaid.exchange_public_token(public_token).await?;

    // The item exists from here on; anything that fails must remove it.
    let mut rollback = Rollback {
        access_token: Some(exchange.access_token.clone()),
        ..Rollback::default()
    };

    match link_account(deps, user, &exchange.access_token, &exchange.item_id, &mut rollback).await {
        Ok(record) => {
            tracing::info!(user_id = %user.user_id, record_id = %record.id, "public token exchange complete");
            Ok(record)
        }
        Err(e) => {
            tracing::error!(user_id = %user.user_id, error = %e, "public token exchange failed");
            rollback.run(deps).await;
            Err(e)
        }
    }
}

async fn link_account(
    deps: &LinkDeps<'_>,
    user: &User,
    access_token: &str,
    item_id: &str,
    rollback: &mut Rollback,
) -> Result<BankAccount, AppError> {
    let account = deps
        .plaid
        .get_accounts(access_token)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound("Linked account"))?;

    let processor_token = deps
        .plaid
        .create_processor_token(access_token, &account.account_id)
        .await?;

    let funding_source_url = deps
        .payments
        .add_funding_source(&user.dwolla_customer_id, &processor_token, &account.name)
        .await?
        .ok_or_else(|| {
            AppError::upstream("dwolla", "funding source created without a Location header")
        })?;
    rollback.funding_source_url = Some(funding_source_url.clone());

    deps.banks
        .insert(NewBankAccount {
            user_id: user.user_id.clone(),
            bank_id: item_id.to_string(),
            shareable_id: encode_shareable_id(&account.account_id),
            account_id: account.account_id,
            access_token: access_token.to_string(),
            funding_source_url,
        })
        .await
}
