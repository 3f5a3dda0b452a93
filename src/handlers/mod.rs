//! HTTP request handlers (route handlers).
//!
//! Handlers extract request data, call into `services`, and shape the JSON
//! response. Errors propagate as `AppError`.

/// Linked accounts, dashboard and transaction history
pub mod accounts;
/// Sign-up, sign-in, sign-out
pub mod auth;
/// Service health
pub mod health;
/// Bank-link token and exchange
pub mod link;
