//! Bank-link handlers.
//!
//! - POST /api/v1/link/token - Create a Plaid Link token
//! - POST /api/v1/link/exchange - Exchange the public token from Link

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::bank_account::BankAccountResponse,
    services::link_service,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct LinkTokenResponse {
    pub link_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub public_token: String,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    /// Always `"complete"`; failures are reported as errors
    pub public_token_exchange: &'static str,
    pub bank: BankAccountResponse,
}

pub async fn create_link_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<LinkTokenResponse>, AppError> {
    let link_token = link_service::create_link_token(state.plaid.as_ref(), &auth.user).await?;

    Ok(Json(LinkTokenResponse { link_token }))
}

/// Link the account behind a public token.
///
/// # Request Body
///
/// ```json
/// { "public_token": "public-sandbox-..." }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "public_token_exchange": "complete",
///   "bank": { "id": "...", "shareable_id": "...", ... }
/// }
/// ```
///
/// Any failed step is returned as an error and leaves no record behind.
pub async fn exchange_public_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ExchangeRequest>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let record =
        link_service::exchange_public_token(&state.link_deps(), &auth.user, &request.public_token)
            .await?;

    Ok(Json(ExchangeResponse {
        public_token_exchange: "complete",
        bank: record.into(),
    }))
}
