//! HTTP router assembly.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the full router: public routes, session-protected routes, tracing.
pub fn router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        .route("/api/v1/auth/sign-out", post(handlers::auth::sign_out))
        .route("/api/v1/me", get(handlers::auth::me))
        // Bank linking
        .route("/api/v1/link/token", post(handlers::link::create_link_token))
        .route(
            "/api/v1/link/exchange",
            post(handlers::link::exchange_public_token),
        )
        // Linked records
        .route("/api/v1/banks", get(handlers::accounts::list_banks))
        .route("/api/v1/banks/{id}", get(handlers::accounts::get_bank))
        .route(
            "/api/v1/banks/shared/{shareable_id}",
            get(handlers::accounts::get_shared_bank),
        )
        // Views
        .route("/api/v1/dashboard", get(handlers::accounts::dashboard))
        .route(
            "/api/v1/transaction-history",
            get(handlers::accounts::transaction_history),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/sign-up", post(handlers::auth::sign_up))
        .route("/api/v1/auth/sign-in", post(handlers::auth::sign_in))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use axum_extra::extract::cookie::{Cookie, SameSite};
    use http_body_util::BodyExt;
    use mockall::predicate::eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::clients::dwolla::MockPaymentsProvider;
    use crate::clients::identity::{IdentityAccount, MockIdentityProvider, Session};
    use crate::clients::plaid::MockBankDataProvider;
    use crate::error::AppError;
    use crate::models::bank_account::encode_shareable_id;
    use crate::services::account_service::tests::{bank, details, transaction};
    use crate::services::bank_store::MockBankAccountStore;
    use crate::services::user_service::MockUserStore;
    use crate::services::user_service::tests::user;

    struct Mocks {
        identity: MockIdentityProvider,
        plaid: MockBankDataProvider,
        payments: MockPaymentsProvider,
        users: MockUserStore,
        banks: MockBankAccountStore,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                identity: MockIdentityProvider::new(),
                plaid: MockBankDataProvider::new(),
                payments: MockPaymentsProvider::new(),
                users: MockUserStore::new(),
                banks: MockBankAccountStore::new(),
            }
        }

        /// Accept session secret "good" as user "u1".
        fn signed_in(mut self) -> Self {
            self.identity
                .expect_current_account()
                .with(eq("good"))
                .returning(|_| {
                    Ok(IdentityAccount {
                        id: "u1".into(),
                        email: "ada@example.com".into(),
                        name: "Ada Lovelace".into(),
                    })
                });
            self.identity
                .expect_current_account()
                .returning(|_| Err(AppError::Unauthorized));
            self.users
                .expect_find_by_user_id()
                .with(eq("u1"))
                .returning(|id| Ok(Some(user(id))));
            self
        }

        fn into_router(self) -> Router {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .connect_lazy("postgres://localhost/unused")
                .unwrap();

            router(AppState {
                pool,
                identity: Arc::new(self.identity),
                plaid: Arc::new(self.plaid),
                payments: Arc::new(self.payments),
                users: Arc::new(self.users),
                banks: Arc::new(self.banks),
                cookie_secure: true,
            })
        }
    }

    fn get(uri: &str, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(secret) = session {
            builder = builder.header(header::COOKIE, format!("appwrite-session={secret}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, session: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(secret) = session {
            builder = builder.header(header::COOKIE, format!("appwrite-session={secret}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn set_cookie(response: &axum::response::Response) -> Cookie<'static> {
        let raw = response.headers()[header::SET_COOKIE].to_str().unwrap();
        Cookie::parse_encoded(raw.to_string()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn protected_route_without_cookie_is_unauthorized() {
        let app = Mocks::new().into_router();

        let response = app
            .oneshot(get("/api/v1/transaction-history", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn protected_route_with_unknown_session_is_unauthorized() {
        let app = Mocks::new().signed_in().into_router();

        let response = app.oneshot(get("/api/v1/me", Some("stale"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sign_in_sets_session_cookie() {
        let mut mocks = Mocks::new();
        mocks
            .identity
            .expect_create_session()
            .with(eq("ada@example.com"), eq("correct horse"))
            .returning(|_, _| {
                Ok(Session {
                    user_id: "u1".into(),
                    secret: "fresh".into(),
                })
            });
        mocks
            .users
            .expect_find_by_user_id()
            .returning(|id| Ok(Some(user(id))));

        let response = mocks
            .into_router()
            .oneshot(post_json(
                "/api/v1/auth/sign-in",
                None,
                json!({ "email": "ada@example.com", "password": "correct horse" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response);
        assert_eq!(cookie.name(), "appwrite-session");
        assert_eq!(cookie.value(), "fresh");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(body_json(response).await["user_id"], "u1");
    }

    #[tokio::test]
    async fn session_secret_with_separators_survives_the_cookie() {
        let mut mocks = Mocks::new();
        mocks.identity.expect_create_session().returning(|_, _| {
            Ok(Session {
                user_id: "u1".into(),
                secret: "a;b c".into(),
            })
        });
        mocks
            .users
            .expect_find_by_user_id()
            .returning(|id| Ok(Some(user(id))));

        let response = mocks
            .into_router()
            .oneshot(post_json(
                "/api/v1/auth/sign-in",
                None,
                json!({ "email": "ada@example.com", "password": "correct horse" }),
            ))
            .await
            .unwrap();

        let raw = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(!raw.contains("a;b c"));
        assert_eq!(set_cookie(&response).value(), "a;b c");
    }

    #[tokio::test]
    async fn quoted_session_cookie_is_accepted() {
        let app = Mocks::new().signed_in().into_router();

        let response = app.oneshot(get("/api/v1/me", Some("\"good\""))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["user_id"], "u1");
    }

    #[tokio::test]
    async fn sign_out_deletes_session_and_clears_cookie() {
        let mut mocks = Mocks::new().signed_in();
        mocks
            .identity
            .expect_delete_session()
            .with(eq("good"))
            .times(1)
            .returning(|_| Ok(()));

        let response = mocks
            .into_router()
            .oneshot(post_json("/api/v1/auth/sign-out", Some("good"), json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn transaction_history_returns_requested_page() {
        let record = bank("u1", "a");
        let record_id = record.id;

        let mut mocks = Mocks::new().signed_in();
        mocks
            .banks
            .expect_get()
            .with(eq(record_id))
            .returning(move |_| Ok(Some(record.clone())));
        mocks
            .plaid
            .expect_get_accounts()
            .returning(|_| Ok(vec![details("a", 42.0)]));
        mocks
            .plaid
            .expect_get_transactions()
            .returning(|_| Ok((0..23).map(|i| transaction(i, "a")).collect()));

        let response = mocks
            .into_router()
            .oneshot(get(
                &format!("/api/v1/transaction-history?id={record_id}&page=3"),
                Some("good"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["account"]["account_id"], "a");
        assert_eq!(body["transactions"]["total_pages"], 3);
        let items = body["transactions"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], "t20");
    }

    #[tokio::test]
    async fn transaction_history_without_links_is_empty() {
        let mut mocks = Mocks::new().signed_in();
        mocks.banks.expect_list_by_user().returning(|_| Ok(vec![]));

        let response = mocks
            .into_router()
            .oneshot(get("/api/v1/transaction-history", Some("good")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["account"].is_null());
        assert_eq!(body["transactions"]["total_pages"], 0);
        assert_eq!(body["transactions"]["items"], json!([]));
    }

    #[tokio::test]
    async fn dashboard_defaults_to_first_account_page_one() {
        let records = vec![bank("u1", "a"), bank("u1", "b")];

        let mut mocks = Mocks::new().signed_in();
        mocks
            .banks
            .expect_list_by_user()
            .with(eq("u1"))
            .times(1)
            .returning(move |_| Ok(records.clone()));
        mocks
            .plaid
            .expect_get_accounts()
            .times(2)
            .returning(|_| Ok(vec![details("a", 10.0), details("b", 5.0)]));
        mocks
            .plaid
            .expect_get_transactions()
            .times(1)
            .returning(|_| Ok((0..15).map(|i| transaction(i, "a")).collect()));

        let response = mocks
            .into_router()
            .oneshot(get("/api/v1/dashboard?page=abc", Some("good")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["overview"]["total_banks"], 2);
        assert_eq!(body["overview"]["total_current_balance"], 15.0);
        assert_eq!(body["selected"]["account_id"], "a");
        assert_eq!(body["recent_transactions"]["page"], 1);
        assert_eq!(body["recent_transactions"]["items"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn exchange_failure_is_reported_not_swallowed() {
        let mut mocks = Mocks::new().signed_in();
        mocks
            .plaid
            .expect_exchange_public_token()
            .returning(|_| Err(AppError::network("plaid", "connection reset")));
        mocks.banks.expect_insert().never();

        let response = mocks
            .into_router()
            .oneshot(post_json(
                "/api/v1/link/exchange",
                Some("good"),
                json!({ "public_token": "public-sandbox-1" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "upstream_unreachable");
    }

    #[tokio::test]
    async fn list_banks_hides_access_tokens() {
        let mut mocks = Mocks::new().signed_in();
        mocks
            .banks
            .expect_list_by_user()
            .returning(|_| Ok(vec![bank("u1", "a")]));

        let response = mocks
            .into_router()
            .oneshot(get("/api/v1/banks", Some("good")))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert!(body[0].get("access_token").is_none());
    }

    #[tokio::test]
    async fn shared_lookup_hides_another_users_bank_identifiers() {
        let record = bank("u2", "raw-acct-secret");
        let mut mocks = Mocks::new().signed_in();
        mocks
            .banks
            .expect_get_by_account_id()
            .with(eq("raw-acct-secret"))
            .returning(move |_| Ok(Some(record.clone())));

        let shareable_id = encode_shareable_id("raw-acct-secret");
        let response = mocks
            .into_router()
            .oneshot(get(
                &format!("/api/v1/banks/shared/{shareable_id}"),
                Some("good"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["shareable_id"], shareable_id.as_str());
        for field in ["id", "account_id", "bank_id", "funding_source_url", "access_token"] {
            assert!(body.get(field).is_none(), "{field} exposed");
        }
        assert!(!body.to_string().contains("raw-acct-secret"));
    }
}
