//! Bank-link service library.
//!
//! Users sign up against an identity service, link bank accounts through
//! Plaid, and have each linked account registered as a Dwolla funding source.
//! Dashboard and transaction-history views read balances and transactions
//! back from Plaid and page through them ten rows at a time.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, holding users and linked bank records
//! - **Authentication**: identity service session secret in an HTTP-only cookie
//! - **Upstreams**: identity (Appwrite), bank data (Plaid), payments (Dwolla)

pub mod app;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod services;
pub mod state;
