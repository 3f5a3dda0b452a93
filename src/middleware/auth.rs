//! Session authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Read the session secret from the session cookie
//! 2. Resolve the identity account and local user behind it
//! 3. Inject authentication context into the request
//! 4. Reject unauthenticated requests with HTTP 401

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{error::AppError, models::user::User, services::user_service, state::AppState};

/// Name of the cookie carrying the identity session secret.
pub const SESSION_COOKIE: &str = "appwrite-session";

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,

    /// Needed to end the session on sign-out
    pub session_secret: String,
}

/// Cookie that stores `secret` as the session.
///
/// The cookie is scoped to `/`, hidden from scripts, and never sent on
/// cross-site requests.
pub fn session_cookie(secret: impl Into<String>, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, secret.into()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

/// Cookie to hand to [`CookieJar::remove`] when ending the session. The path
/// must match the one the session cookie was set with.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Session secret from the request cookies, without RFC 6265 quotes.
pub fn session_secret(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value_trimmed())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Session authentication middleware function.
///
/// # Flow
///
/// 1. Read the `appwrite-session` cookie
/// 2. Ask the identity service which account owns the session
/// 3. Load the local user for that account
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. Otherwise: return 401 Unauthorized
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = session_secret(&jar).ok_or(AppError::Unauthorized)?;

    let user = user_service::user_for_session(state.identity.as_ref(), state.users.as_ref(), &secret)
        .await
        .map_err(|e| match e {
            // A session without a user row cannot be used either.
            AppError::NotFound(_) => AppError::Unauthorized,
            other => other,
        })?;

    request.extensions_mut().insert(AuthContext {
        user,
        session_secret: secret,
    });

    Ok(next.run(request).await)
}
