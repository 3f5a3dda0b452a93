//! Data models for stored records and upstream views.

/// Linked bank account record
pub mod bank_account;
/// Bank-side account and transaction views
pub mod transaction;
/// Signed-up user record
pub mod user;
