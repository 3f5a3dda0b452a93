//! Linked bank account records.
//!
//! A record is written once when a user finishes the bank-link flow and is
//! never updated afterwards. It ties together the identifiers handed out by
//! Plaid (item, account, access token) and Dwolla (funding source).

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a bank account record from the database.
///
/// `access_token` is a durable Plaid credential and is deliberately not
/// `Serialize`; clients only ever see [`BankAccountResponse`].
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BankAccount {
    pub id: Uuid,

    /// Identity account id of the owner
    pub user_id: String,

    /// Plaid item id
    pub bank_id: String,

    /// Plaid account id
    pub account_id: String,

    pub access_token: String,

    pub funding_source_url: String,

    /// Reversible encoding of `account_id`, see [`encode_shareable_id`]
    pub shareable_id: String,

    pub created_at: DateTime<Utc>,
}

/// Values needed to insert a new bank account row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBankAccount {
    pub user_id: String,
    pub bank_id: String,
    pub account_id: String,
    pub access_token: String,
    pub funding_source_url: String,
    pub shareable_id: String,
}

/// Response body for bank account endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankAccountResponse {
    pub id: Uuid,
    pub bank_id: String,
    pub account_id: String,
    pub funding_source_url: String,
    pub shareable_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<BankAccount> for BankAccountResponse {
    fn from(bank: BankAccount) -> Self {
        Self {
            id: bank.id,
            bank_id: bank.bank_id,
            account_id: bank.account_id,
            funding_source_url: bank.funding_source_url,
            shareable_id: bank.shareable_id,
            created_at: bank.created_at,
        }
    }
}

/// What a shareable id resolves to for other users.
///
/// Carries nothing that identifies the account at Plaid or Dwolla.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedBankResponse {
    pub shareable_id: String,
    pub linked_at: DateTime<Utc>,
}

impl From<BankAccount> for SharedBankResponse {
    fn from(bank: BankAccount) -> Self {
        Self {
            shareable_id: bank.shareable_id,
            linked_at: bank.created_at,
        }
    }
}

/// Encode an account id into a form that is safe to put in links.
///
/// The encoding is URL-safe base64 without padding. It is deterministic and
/// obfuscates rather than protects: anyone can reverse it with
/// [`decode_shareable_id`].
pub fn encode_shareable_id(account_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(account_id.as_bytes())
}

/// Reverse [`encode_shareable_id`]. Returns `None` for input that is not a
/// valid encoding of a UTF-8 string.
pub fn decode_shareable_id(shareable_id: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(shareable_id).ok()?;
    String::from_utf8(bytes).ok()
}
