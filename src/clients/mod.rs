//! Clients for the upstream platforms the service delegates to.
//!
//! Each client sits behind a trait so services can be exercised against
//! mocks. Transport failures become [`AppError::Network`]; error answers from
//! the upstream become [`AppError::Upstream`] unless a more specific variant
//! applies.

use std::time::Duration;

use crate::error::AppError;

/// Payments platform (Dwolla)
pub mod dwolla;
/// Identity and session service (Appwrite)
pub mod identity;
/// Bank-data aggregation (Plaid)
pub mod plaid;

/// Build the shared HTTP client used by every upstream client.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Send a prepared request, mapping transport failures to `Network`.
pub(crate) async fn send(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, AppError> {
    request.send().await.map_err(|e| {
        tracing::error!(service, error = %e, "upstream request failed");
        AppError::network(service, e)
    })
}

/// Read a JSON body, treating an undecodable payload as an upstream error.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T, AppError> {
    response
        .json::<T>()
        .await
        .map_err(|e| AppError::upstream(service, format!("unexpected response: {e}")))
}
