//! Dwolla client.
//!
//! Dwolla answers resource creation with `201 Created` and an empty body; the
//! new resource is identified only by the `Location` header. Calls are
//! authorised with a client-credentials token fetched per operation.

use async_trait::async_trait;
use reqwest::{StatusCode, header};
use serde::Deserialize;
use serde_json::json;

use super::{read_json, send};
use crate::config::DwollaConfig;
use crate::error::AppError;

const SERVICE: &str = "dwolla";
const MEDIA_TYPE: &str = "application/vnd.dwolla.v1.hal+json";

/// Personal customer details forwarded from sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub ssn: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentsProvider: Send + Sync {
    /// Create a verified personal customer. Returns the customer URL, or
    /// `None` if Dwolla accepted the request without reporting one.
    async fn create_customer(&self, customer: NewCustomer) -> Result<Option<String>, AppError>;

    /// Register a bank account as a funding source for `customer_id` using a
    /// Plaid processor token. Returns the funding-source URL, or `None` if
    /// Dwolla accepted the request without reporting one.
    async fn add_funding_source(
        &self,
        customer_id: &str,
        processor_token: &str,
        bank_name: &str,
    ) -> Result<Option<String>, AppError>;

    /// Mark a funding source as removed.
    async fn remove_funding_source(&self, funding_source_url: &str) -> Result<(), AppError>;
}

/// The customer id is the last path segment of the customer URL.
pub fn customer_id_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()
        .map(str::to_string)
}

pub struct DwollaClient {
    http: reqwest::Client,
    config: DwollaConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OnDemandAuthorization {
    #[serde(rename = "_links")]
    links: OnDemandLinks,
}

#[derive(Debug, Deserialize)]
struct OnDemandLinks {
    #[serde(rename = "self")]
    this: Link,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Default, Deserialize)]
struct DwollaError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl DwollaClient {
    pub fn new(http: reqwest::Client, config: DwollaConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.env.base_url(), path)
    }

    async fn token(&self) -> Result<String, AppError> {
        let request = self
            .http
            .post(self.url("/token"))
            .basic_auth(&self.config.key, Some(&self.config.secret))
            .form(&[("grant_type", "client_credentials")]);

        let response = check(send(SERVICE, request).await?).await?;
        let token: TokenResponse = read_json(SERVICE, response).await?;
        Ok(token.access_token)
    }

    async fn authorized(&self, method: reqwest::Method, url: &str) -> Result<reqwest::RequestBuilder, AppError> {
        let token = self.token().await?;
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(header::ACCEPT, MEDIA_TYPE)
            .header(header::CONTENT_TYPE, MEDIA_TYPE))
    }

    async fn on_demand_authorization(&self) -> Result<String, AppError> {
        let request = self
            .authorized(reqwest::Method::POST, &self.url("/on-demand-authorizations"))
            .await?;

        let response = check(send(SERVICE, request).await?).await?;
        let auth: OnDemandAuthorization = read_json(SERVICE, response).await?;
        Ok(auth.links.this.href)
    }
}

fn location(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let err = response.json::<DwollaError>().await.unwrap_or_default();
    tracing::error!(%status, code = %err.code, "dwolla request failed");

    Err(match (status, err.code.as_str()) {
        (_, "DuplicateResource") => AppError::Conflict(err.message),
        (StatusCode::BAD_REQUEST, _) => AppError::Validation(err.message),
        (StatusCode::NOT_FOUND, _) => AppError::NotFound("Dwolla resource"),
        _ => AppError::upstream(SERVICE, format!("{}: {}", err.code, err.message)),
    })
}

#[async_trait]
impl PaymentsProvider for DwollaClient {
    async fn create_customer(&self, customer: NewCustomer) -> Result<Option<String>, AppError> {
        let request = self
            .authorized(reqwest::Method::POST, &self.url("/customers"))
            .await?
            .json(&json!({
                "firstName": customer.first_name,
                "lastName": customer.last_name,
                "email": customer.email,
                "type": "personal",
                "address1": customer.address1,
                "city": customer.city,
                "state": customer.state,
                "postalCode": customer.postal_code,
                "dateOfBirth": customer.date_of_birth,
                "ssn": customer.ssn,
            }));

        let response = check(send(SERVICE, request).await?).await?;
        Ok(location(&response))
    }

    async fn add_funding_source(
        &self,
        customer_id: &str,
        processor_token: &str,
        bank_name: &str,
    ) -> Result<Option<String>, AppError> {
        let authorization = self.on_demand_authorization().await?;

        let url = self.url(&format!("/customers/{customer_id}/funding-sources"));
        let request = self
            .authorized(reqwest::Method::POST, &url)
            .await?
            .json(&json!({
                "name": bank_name,
                "plaidToken": processor_token,
                "_links": {
                    "on-demand-authorization": { "href": authorization }
                },
            }));

        let response = check(send(SERVICE, request).await?).await?;
        Ok(location(&response))
    }

    async fn remove_funding_source(&self, funding_source_url: &str) -> Result<(), AppError> {
        let request = self
            .authorized(reqwest::Method::POST, funding_source_url)
            .await?
            .json(&json!({ "removed": true }));

        check(send(SERVICE, request).await?).await?;
        Ok(())
    }
}
