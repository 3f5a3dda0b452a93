//! Error types and HTTP error response handling.
//!
//! Every operation in the service returns `Result<T, AppError>`. A missing
//! record is `Ok(None)` or an empty list; an `AppError` always means the
//! operation itself failed, so callers never have to guess.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Network**: an upstream could not be reached or timed out
/// - **Upstream**: an upstream answered with an error or an unusable payload
/// - **Validation**: the request itself is invalid
/// - **NotFound**: the requested resource does not exist for this user
/// - **Conflict**: the operation would duplicate an existing resource
/// - **Unauthorized**: missing or invalid session or credentials
/// - **Database**: any `sqlx::Error`
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport-level failure talking to `service`.
    #[error("{service} is unreachable: {message}")]
    Network {
        service: &'static str,
        message: String,
    },

    /// `service` answered, but not with something we can use.
    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn network(service: &'static str, err: impl std::fmt::Display) -> Self {
        AppError::Network {
            service,
            message: err.to_string(),
        }
    }

    pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        AppError::Upstream {
            service,
            message: message.into(),
        }
    }

    /// Machine-readable code returned in the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "internal_error",
            AppError::Network { .. } => "upstream_unreachable",
            AppError::Upstream { .. } => "upstream_error",
            AppError::Validation(_) => "invalid_request",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Unauthorized => "unauthorized",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Network { .. } | AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database details are hidden from the client and logged instead.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::network("plaid", "timed out"), StatusCode::BAD_GATEWAY, "upstream_unreachable")]
    #[case(AppError::upstream("dwolla", "no location"), StatusCode::BAD_GATEWAY, "upstream_error")]
    #[case(AppError::Validation("page".into()), StatusCode::BAD_REQUEST, "invalid_request")]
    #[case(AppError::NotFound("Bank account"), StatusCode::NOT_FOUND, "not_found")]
    #[case(AppError::Conflict("dup".into()), StatusCode::CONFLICT, "conflict")]
    #[case(AppError::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized")]
    #[case(AppError::Database(sqlx::Error::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR, "internal_error")]
    fn maps_variants_to_status_and_code(
        #[case] err: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        assert_eq!(err.status(), status);
        assert_eq!(err.code(), code);
    }

    #[tokio::test]
    async fn database_details_are_hidden() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }
}
