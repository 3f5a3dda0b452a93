//! Shared application state.

use std::sync::Arc;

use crate::clients::dwolla::PaymentsProvider;
use crate::clients::identity::IdentityProvider;
use crate::clients::plaid::BankDataProvider;
use crate::db::DbPool;
use crate::services::bank_store::BankAccountStore;
use crate::services::link_service::LinkDeps;
use crate::services::user_service::UserStore;

/// Everything a handler may need, built once at startup.
///
/// Upstreams and stores are trait objects so tests can swap in mocks.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub identity: Arc<dyn IdentityProvider>,
    pub plaid: Arc<dyn BankDataProvider>,
    pub payments: Arc<dyn PaymentsProvider>,
    pub users: Arc<dyn UserStore>,
    pub banks: Arc<dyn BankAccountStore>,

    /// Whether the session cookie carries the `Secure` attribute
    pub cookie_secure: bool,
}

impl AppState {
    pub fn link_deps(&self) -> LinkDeps<'_> {
        LinkDeps {
            plaid: self.plaid.as_ref(),
            payments: self.payments.as_ref(),
            banks: self.banks.as_ref(),
        }
    }
}
