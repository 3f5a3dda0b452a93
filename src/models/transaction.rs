//! Bank-side views of accounts and transactions.
//!
//! These are read from Plaid on every request and never stored locally.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// A single transaction as reported by the bank.
///
/// The sequence of transactions for an account arrives already ordered and is
/// passed through untouched: no sorting, no deduplication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub name: String,

    /// Positive values are money leaving the account
    pub amount: f64,

    pub date: NaiveDate,
    pub category: Option<String>,
    pub payment_channel: String,
    pub pending: bool,

    /// Merchant logo URL
    pub image: Option<String>,
}

/// A bank account as reported by the bank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankAccountDetails {
    pub account_id: String,
    pub name: String,
    pub official_name: Option<String>,
    pub mask: Option<String>,
    #[serde(rename = "type")]
    pub account_type: String,
    pub subtype: Option<String>,
    pub current_balance: Option<f64>,
    pub available_balance: Option<f64>,
}

/// Account details joined with the local record that links them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    /// Local bank account record id, used as the `id` query parameter
    pub record_id: Uuid,
    pub shareable_id: String,
    #[serde(flatten)]
    pub details: BankAccountDetails,
}
