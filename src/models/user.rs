//! User data models and sign-up / sign-in request types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. `user_id` is the identity service's account id
/// and is how every authenticated request finds its user.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: Uuid,

    /// Identity service account id (unique)
    pub user_id: String,

    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,

    /// Payments customer id, the last path segment of `dwolla_customer_url`
    pub dwolla_customer_id: String,
    pub dwolla_customer_url: String,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Values needed to insert a new user row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub dwolla_customer_id: String,
    pub dwolla_customer_url: String,
}

/// Request body for signing up.
///
/// # JSON Example
///
/// ```json
/// {
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "address1": "1 Main St",
///   "city": "New York",
///   "state": "NY",
///   "postal_code": "10001",
///   "date_of_birth": "1990-01-01",
///   "ssn": "1234",
///   "email": "ada@example.com",
///   "password": "correct horse"
/// }
/// ```
///
/// `ssn` is forwarded to the payments API and never stored.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub ssn: String,
    pub email: String,
    pub password: String,
}

impl SignUpRequest {
    /// Reject obviously unusable input before any upstream call is made.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address1", &self.address1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
            ("date_of_birth", &self.date_of_birth),
            ("ssn", &self.ssn),
            ("email", &self.email),
        ];

        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(format!("{field} is required"));
        }

        if !self.email.contains('@') {
            return Err("email is invalid".to_string());
        }

        if self.password.len() < 8 {
            return Err("password must be at least 8 characters".to_string());
        }

        if self.state.len() != 2 {
            return Err("state must be a two-letter code".to_string());
        }

        if chrono::NaiveDate::parse_from_str(&self.date_of_birth, "%Y-%m-%d").is_err() {
            return Err("date_of_birth must be YYYY-MM-DD".to_string());
        }

        Ok(())
    }
}

/// Request body for signing in.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}
