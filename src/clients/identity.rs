//! Identity service client.
//!
//! Accounts and sessions live in an Appwrite project. Account creation and
//! session creation use the server key; everything done on behalf of a
//! signed-in user sends that user's session secret instead.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{read_json, send};
use crate::config::IdentityConfig;
use crate::error::AppError;

const SERVICE: &str = "identity";

/// An account as known by the identity service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdentityAccount {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// A freshly created session. `secret` goes into the session cookie.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub secret: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account. Fails with `Conflict` if the email is taken.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, AppError>;

    /// Create an email/password session. Bad credentials are `Unauthorized`.
    async fn create_session(&self, email: &str, password: &str) -> Result<Session, AppError>;

    /// Resolve the account that owns a session secret.
    async fn current_account(&self, secret: &str) -> Result<IdentityAccount, AppError>;

    /// Delete the session identified by `secret`.
    async fn delete_session(&self, secret: &str) -> Result<(), AppError>;
}

pub struct AppwriteClient {
    http: reqwest::Client,
    config: IdentityConfig,
}

impl AppwriteClient {
    pub fn new(http: reqwest::Client, config: IdentityConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn admin(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Appwrite-Project", &self.config.project)
            .header("X-Appwrite-Key", &self.config.key)
    }

    fn as_session(&self, request: reqwest::RequestBuilder, secret: &str) -> reqwest::RequestBuilder {
        request
            .header("X-Appwrite-Project", &self.config.project)
            .header("X-Appwrite-Session", secret)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Map a non-success identity response to an `AppError`.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|b| b.message)
        .unwrap_or_default();

    Err(match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized,
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::BAD_REQUEST => AppError::Validation(message),
        _ => AppError::upstream(SERVICE, format!("{status}: {message}")),
    })
}

#[async_trait]
impl IdentityProvider for AppwriteClient {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, AppError> {
        let request = self.admin(self.http.post(self.url("/users"))).json(&json!({
            "userId": "unique()",
            "email": email,
            "password": password,
            "name": name,
        }));

        let response = check(send(SERVICE, request).await?).await?;
        read_json(SERVICE, response).await
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let request = self
            .admin(self.http.post(self.url("/account/sessions/email")))
            .json(&json!({ "email": email, "password": password }));

        let response = check(send(SERVICE, request).await?).await?;
        read_json(SERVICE, response).await
    }

    async fn current_account(&self, secret: &str) -> Result<IdentityAccount, AppError> {
        let request = self.as_session(self.http.get(self.url("/account")), secret);

        let response = check(send(SERVICE, request).await?).await?;
        read_json(SERVICE, response).await
    }

    async fn delete_session(&self, secret: &str) -> Result<(), AppError> {
        let request = self.as_session(
            self.http.delete(self.url("/account/sessions/current")),
            secret,
        );

        check(send(SERVICE, request).await?).await?;
        Ok(())
    }
}
