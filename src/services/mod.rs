//! Business logic services.
//!
//! Services hold the logic between HTTP handlers and the upstream clients or
//! database. Handlers stay thin; everything that can fail returns `AppError`.

pub mod account_service;
pub mod bank_store;
pub mod link_service;
pub mod user_service;
