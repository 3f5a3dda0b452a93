//! Sign-up, sign-in and session resolution.
//!
//! The identity service owns credentials and sessions. The local `users`
//! table holds the profile and the Dwolla customer created at sign-up.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::clients::dwolla::{NewCustomer, PaymentsProvider, customer_id_from_url};
use crate::clients::identity::{IdentityProvider, Session};
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::user::{NewUser, SignInRequest, SignUpRequest, User};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;

    /// Look up the user for an identity account id.
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, AppError>;
}

pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                user_id, email, first_name, last_name, address1, city, state,
                postal_code, date_of_birth, dwolla_customer_id, dwolla_customer_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(user.user_id)
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.address1)
        .bind(user.city)
        .bind(user.state)
        .bind(user.postal_code)
        .bind(user.date_of_birth)
        .bind(user.dwolla_customer_id)
        .bind(user.dwolla_customer_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("User already exists".to_string())
            }
            other => AppError::Database(other),
        })
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

/// Short, non-reversible tag for a session secret, safe to put in logs.
pub fn session_fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(&digest[..6])
}

/// Create the identity account, the Dwolla customer and the local user, then
/// open a session.
///
/// # Process
///
/// 1. Create identity account
/// 2. Create Dwolla personal customer (a missing customer URL is an error)
/// 3. Store the user with the customer id and URL
/// 4. Create an email/password session
pub async fn sign_up(
    identity: &dyn IdentityProvider,
    payments: &dyn PaymentsProvider,
    users: &dyn UserStore,
    request: SignUpRequest,
) -> Result<(User, Session), AppError> {
    request.validate().map_err(AppError::Validation)?;

    let name = format!("{} {}", request.first_name, request.last_name);
    let account = identity
        .create_account(&request.email, &request.password, &name)
        .await?;
    tracing::info!(user_id = %account.id, "identity account created");

    let customer_url = payments
        .create_customer(NewCustomer {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            address1: request.address1.clone(),
            city: request.city.clone(),
            state: request.state.clone(),
            postal_code: request.postal_code.clone(),
            date_of_birth: request.date_of_birth.clone(),
            ssn: request.ssn.clone(),
        })
        .await?
        .ok_or_else(|| AppError::upstream("dwolla", "customer created without a Location header"))?;

    let customer_id = customer_id_from_url(&customer_url).ok_or_else(|| {
        AppError::upstream("dwolla", format!("customer URL has no id: {customer_url}"))
    })?;

    let user = users
        .insert(NewUser {
            user_id: account.id,
            email: request.email.clone(),
            first_name: request.first_name,
            last_name: request.last_name,
            address1: request.address1,
            city: request.city,
            state: request.state,
            postal_code: request.postal_code,
            date_of_birth: request.date_of_birth,
            dwolla_customer_id: customer_id,
            dwolla_customer_url: customer_url,
        })
        .await?;

    let session = identity
        .create_session(&request.email, &request.password)
        .await?;
    tracing::info!(user_id = %user.user_id, session = %session_fingerprint(&session.secret), "signed up");

    Ok((user, session))
}

/// Open a session and load the matching user.
pub async fn sign_in(
    identity: &dyn IdentityProvider,
    users: &dyn UserStore,
    request: SignInRequest,
) -> Result<(User, Session), AppError> {
    let session = identity
        .create_session(&request.email, &request.password)
        .await?;

    // The session is only useful together with a local user row; end it
    // otherwise so it does not linger at the identity service.
    let user = match users.find_by_user_id(&session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(user_id = %session.user_id, "identity account has no local user");
            discard_session(identity, &session.secret).await;
            return Err(AppError::Unauthorized);
        }
        Err(e) => {
            discard_session(identity, &session.secret).await;
            return Err(e);
        }
    };

    tracing::info!(user_id = %user.user_id, session = %session_fingerprint(&session.secret), "signed in");

    Ok((user, session))
}

async fn discard_session(identity: &dyn IdentityProvider, secret: &str) {
    if let Err(e) = identity.delete_session(secret).await {
        tracing::warn!(session = %session_fingerprint(secret), error = %e, "failed to end session");
    }
}

/// Resolve the user behind a session secret.
///
/// An unknown or expired session is `Unauthorized`; a valid session whose
/// user row is missing is `NotFound`.
pub async fn user_for_session(
    identity: &dyn IdentityProvider,
    users: &dyn UserStore,
    secret: &str,
) -> Result<User, AppError> {
    let account = identity.current_account(secret).await?;

    users
        .find_by_user_id(&account.id)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn sign_out(identity: &dyn IdentityProvider, secret: &str) -> Result<(), AppError> {
    identity.delete_session(secret).await?;
    tracing::info!(session = %session_fingerprint(secret), "signed out");
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clients::dwolla::MockPaymentsProvider;
    use crate::clients::identity::{IdentityAccount, MockIdentityProvider};
    use chrono::Utc;
    use mockall::predicate::eq;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    pub(crate) fn user(user_id: &str) -> User {
        User {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            address1: "1 Main St".into(),
            city: "New York".into(),
            state: "NY".into(),
            postal_code: "10001".into(),
            date_of_birth: "1990-01-01".into(),
            dwolla_customer_id: "cust-1".into(),
            dwolla_customer_url: "https://api-sandbox.dwolla.com/customers/cust-1".into(),
            created_at: Utc::now(),
        }
    }

    #[fixture]
    fn sign_up_request() -> SignUpRequest {
        SignUpRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            address1: "1 Main St".into(),
            city: "New York".into(),
            state: "NY".into(),
            postal_code: "10001".into(),
            date_of_birth: "1990-01-01".into(),
            ssn: "1234".into(),
            email: "ada@example.com".into(),
            password: "correct horse".into(),
        }
    }

    fn identity_for_sign_up() -> MockIdentityProvider {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_account()
            .with(eq("ada@example.com"), eq("correct horse"), eq("Ada Lovelace"))
            .returning(|email, _, name| {
                Ok(IdentityAccount {
                    id: "u1".into(),
                    email: email.into(),
                    name: name.into(),
                })
            });
        identity
    }

    #[rstest]
    #[tokio::test]
    async fn sign_up_stores_customer_id_from_url(sign_up_request: SignUpRequest) {
        let mut identity = identity_for_sign_up();
        identity.expect_create_session().returning(|_, _| {
            Ok(Session {
                user_id: "u1".into(),
                secret: "secret".into(),
            })
        });

        let mut payments = MockPaymentsProvider::new();
        payments
            .expect_create_customer()
            .withf(|c| c.ssn == "1234" && c.state == "NY")
            .returning(|_| Ok(Some("https://api-sandbox.dwolla.com/customers/cust-9".into())));

        let mut users = MockUserStore::new();
        users
            .expect_insert()
            .withf(|u| {
                u.user_id == "u1"
                    && u.dwolla_customer_id == "cust-9"
                    && u.dwolla_customer_url.ends_with("/customers/cust-9")
            })
            .returning(|u| {
                let mut stored = user(&u.user_id);
                stored.dwolla_customer_id = u.dwolla_customer_id;
                Ok(stored)
            });

        let (user, session) = sign_up(&identity, &payments, &users, sign_up_request)
            .await
            .unwrap();

        assert_eq!(user.dwolla_customer_id, "cust-9");
        assert_eq!(session.secret, "secret");
    }

    #[rstest]
    #[tokio::test]
    async fn sign_up_fails_without_customer_url(sign_up_request: SignUpRequest) {
        let identity = identity_for_sign_up();

        let mut payments = MockPaymentsProvider::new();
        payments.expect_create_customer().returning(|_| Ok(None));

        let mut users = MockUserStore::new();
        users.expect_insert().never();

        let err = sign_up(&identity, &payments, &users, sign_up_request)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "upstream_error");
    }

    #[rstest]
    #[tokio::test]
    async fn sign_up_validates_before_calling_upstream(mut sign_up_request: SignUpRequest) {
        sign_up_request.password = "short".into();

        let identity = MockIdentityProvider::new();
        let payments = MockPaymentsProvider::new();
        let users = MockUserStore::new();

        let err = sign_up(&identity, &payments, &users, sign_up_request)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn sign_in_with_bad_credentials_is_unauthorized() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_create_session()
            .returning(|_, _| Err(AppError::Unauthorized));
        let users = MockUserStore::new();

        let err = sign_in(
            &identity,
            &users,
            SignInRequest {
                email: "ada@example.com".into(),
                password: "wrong".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn sign_in_without_user_row_ends_session() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_create_session().returning(|_, _| {
            Ok(Session {
                user_id: "ghost".into(),
                secret: "orphan".into(),
            })
        });
        identity
            .expect_delete_session()
            .with(eq("orphan"))
            .times(1)
            .returning(|_| Ok(()));
        let mut users = MockUserStore::new();
        users.expect_find_by_user_id().returning(|_| Ok(None));

        let err = sign_in(
            &identity,
            &users,
            SignInRequest {
                email: "ghost@example.com".into(),
                password: "whatever1".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn session_without_user_row_is_not_found() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_current_account().returning(|_| {
            Ok(IdentityAccount {
                id: "ghost".into(),
                email: "ghost@example.com".into(),
                name: String::new(),
            })
        });
        let mut users = MockUserStore::new();
        users
            .expect_find_by_user_id()
            .with(eq("ghost"))
            .returning(|_| Ok(None));

        let err = user_for_session(&identity, &users, "secret").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound("User")));
    }

    #[test]
    fn fingerprint_is_short_and_stable() {
        let a = session_fingerprint("secret");

        assert_eq!(a.len(), 12);
        assert_eq!(a, session_fingerprint("secret"));
        assert_ne!(a, session_fingerprint("other"));
    }
}
