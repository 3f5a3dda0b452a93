//! Application configuration management.
//!
//! Configuration is read once at startup from environment variables (with an
//! optional `.env` file) and handed to every component that needs it. Nothing
//! else in the crate reads the process environment.

use serde::Deserialize;

/// Top-level configuration.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `HTTP_TIMEOUT_SECS` (optional): timeout for upstream calls, defaults to 30
/// - `COOKIE_SECURE` (optional): mark the session cookie `Secure`, defaults to true
///
/// Upstream credentials live in [`IdentityConfig`], [`PlaidConfig`] and
/// [`DwollaConfig`], each read with its own prefix.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub plaid: PlaidConfig,
    pub dwolla: DwollaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub cookie_secure: bool,
}

/// Identity service settings, read from `APPWRITE_*`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Base URL including the API version, e.g. `https://cloud.appwrite.io/v1`.
    pub endpoint: String,
    pub project: String,
    /// Server API key used for admin calls such as account creation.
    pub key: String,
}

/// Plaid settings, read from `PLAID_*`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: String,

    #[serde(default)]
    pub env: PlaidEnvironment,

    #[serde(default = "default_products")]
    pub products: Vec<String>,

    #[serde(default = "default_country_codes")]
    pub country_codes: Vec<String>,
}

/// Dwolla settings, read from `DWOLLA_*`.
#[derive(Debug, Clone, Deserialize)]
pub struct DwollaConfig {
    pub key: String,
    pub secret: String,

    #[serde(default)]
    pub env: DwollaEnvironment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
            PlaidEnvironment::Development => "https://development.plaid.com",
            PlaidEnvironment::Production => "https://production.plaid.com",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DwollaEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl DwollaEnvironment {
    pub fn base_url(self) -> &'static str {
        match self {
            DwollaEnvironment::Sandbox => "https://api-sandbox.dwolla.com",
            DwollaEnvironment::Production => "https://api.dwolla.com",
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_products() -> Vec<String> {
    vec!["auth".to_string()]
}

fn default_country_codes() -> Vec<String> {
    ["US", "CA", "GB", "BE"].iter().map(|c| c.to_string()).collect()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if present. List values such as
    /// `PLAID_COUNTRY_CODES` are comma separated.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot be
    /// parsed into its expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Build configuration from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();

        Ok(Self {
            server: envy::from_iter(vars.clone())?,
            identity: envy::prefixed("APPWRITE_").from_iter(vars.clone())?,
            plaid: envy::prefixed("PLAID_").from_iter(vars.clone())?,
            dwolla: envy::prefixed("DWOLLA_").from_iter(vars)?,
        })
    }
}
