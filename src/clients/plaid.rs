//! Plaid client.
//!
//! Every Plaid endpoint is a `POST` with a JSON body carrying `client_id` and
//! `secret`. Errors come back as a JSON object with `error_code` and
//! `error_message`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{read_json, send};
use crate::config::PlaidConfig;
use crate::error::AppError;
use crate::models::transaction::{BankAccountDetails, Transaction};

const SERVICE: &str = "plaid";

/// Processor that funding sources are registered with.
const PROCESSOR: &str = "dwolla";

/// Who a link token is being created for.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTokenRequest {
    pub client_user_id: String,
    pub client_name: String,
}

/// Result of exchanging a public token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenExchange {
    pub access_token: String,
    pub item_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BankDataProvider: Send + Sync {
    async fn create_link_token(&self, request: LinkTokenRequest) -> Result<String, AppError>;

    async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange, AppError>;

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<BankAccountDetails>, AppError>;

    async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, AppError>;

    /// Every transaction visible to `access_token`, in the order Plaid
    /// returns them.
    async fn get_transactions(&self, access_token: &str) -> Result<Vec<Transaction>, AppError>;

    /// Remove the item, revoking its access token and processor tokens.
    async fn remove_item(&self, access_token: &str) -> Result<(), AppError>;
}

pub struct PlaidClient {
    http: reqwest::Client,
    config: PlaidConfig,
}

impl PlaidClient {
    pub fn new(http: reqwest::Client, config: PlaidConfig) -> Self {
        Self { http, config }
    }

    /// POST `body` to `path` with credentials merged in.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        mut body: Value,
    ) -> Result<T, AppError> {
        if let Value::Object(map) = &mut body {
            map.insert("client_id".into(), Value::String(self.config.client_id.clone()));
            map.insert("secret".into(), Value::String(self.config.secret.clone()));
        }

        let url = format!("{}{}", self.config.env.base_url(), path);
        let response = send(SERVICE, self.http.post(url).json(&body)).await?;

        if !response.status().is_success() {
            let status = response.status();
            let err = response.json::<PlaidError>().await.unwrap_or_default();
            tracing::error!(
                path,
                %status,
                error_code = %err.error_code,
                request_id = %err.request_id,
                "plaid request failed"
            );
            return Err(err.into_app_error());
        }

        read_json(SERVICE, response).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct PlaidError {
    #[serde(default)]
    error_type: String,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    request_id: String,
}

impl PlaidError {
    fn into_app_error(self) -> AppError {
        match (self.error_type.as_str(), self.error_code.as_str()) {
            // Only the public token comes from the client; every other
            // rejection concerns credentials the server holds.
            (_, "INVALID_PUBLIC_TOKEN") => AppError::Validation(self.error_message),
            _ => AppError::upstream(SERVICE, format!("{}: {}", self.error_code, self.error_message)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<PlaidAccount>,
}

#[derive(Debug, Deserialize)]
struct PlaidAccount {
    account_id: String,
    name: String,
    official_name: Option<String>,
    mask: Option<String>,
    #[serde(rename = "type")]
    account_type: String,
    subtype: Option<String>,
    balances: PlaidBalances,
}

#[derive(Debug, Deserialize)]
struct PlaidBalances {
    current: Option<f64>,
    available: Option<f64>,
}

impl From<PlaidAccount> for BankAccountDetails {
    fn from(account: PlaidAccount) -> Self {
        Self {
            account_id: account.account_id,
            name: account.name,
            official_name: account.official_name,
            mask: account.mask,
            account_type: account.account_type,
            subtype: account.subtype,
            current_balance: account.balances.current,
            available_balance: account.balances.available,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProcessorTokenResponse {
    processor_token: String,
}

#[derive(Debug, Deserialize)]
struct SyncResponse {
    added: Vec<PlaidTransaction>,
    next_cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct PlaidTransaction {
    transaction_id: String,
    account_id: String,
    name: String,
    amount: f64,
    date: NaiveDate,
    #[serde(default)]
    category: Option<Vec<String>>,
    payment_channel: String,
    pending: bool,
    #[serde(default)]
    logo_url: Option<String>,
}

impl From<PlaidTransaction> for Transaction {
    fn from(txn: PlaidTransaction) -> Self {
        Self {
            id: txn.transaction_id,
            account_id: txn.account_id,
            name: txn.name,
            amount: txn.amount,
            date: txn.date,
            category: txn.category.and_then(|c| c.into_iter().next()),
            payment_channel: txn.payment_channel,
            pending: txn.pending,
            image: txn.logo_url,
        }
    }
}

#[async_trait]
impl BankDataProvider for PlaidClient {
    async fn create_link_token(&self, request: LinkTokenRequest) -> Result<String, AppError> {
        let body = json!({
            "user": { "client_user_id": request.client_user_id },
            "client_name": request.client_name,
            "products": self.config.products,
            "language": "en",
            "country_codes": self.config.country_codes,
        });

        let response: LinkTokenResponse = self.call("/link/token/create", body).await?;
        Ok(response.link_token)
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange, AppError> {
        self.call(
            "/item/public_token/exchange",
            json!({ "public_token": public_token }),
        )
        .await
    }

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<BankAccountDetails>, AppError> {
        let response: AccountsResponse = self
            .call("/accounts/get", json!({ "access_token": access_token }))
            .await?;

        Ok(response.accounts.into_iter().map(Into::into).collect())
    }

    async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, AppError> {
        let response: ProcessorTokenResponse = self
            .call(
                "/processor/token/create",
                json!({
                    "access_token": access_token,
                    "account_id": account_id,
                    "processor": PROCESSOR,
                }),
            )
            .await?;

        Ok(response.processor_token)
    }

    async fn get_transactions(&self, access_token: &str) -> Result<Vec<Transaction>, AppError> {
        let mut transactions = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "access_token": access_token });
            if let Some(c) = &cursor {
                body["cursor"] = Value::String(c.clone());
            }

            let page: SyncResponse = self.call("/transactions/sync", body).await?;
            transactions.extend(page.added.into_iter().map(Transaction::from));

            if !page.has_more {
                break;
            }
            cursor = Some(page.next_cursor);
        }

        Ok(transactions)
    }

    async fn remove_item(&self, access_token: &str) -> Result<(), AppError> {
        let _: Value = self
            .call("/item/remove", json!({ "access_token": access_token }))
            .await?;
        Ok(())
    }
}
