//! Sign-up, sign-in and sign-out handlers.
//!
//! - POST /api/v1/auth/sign-up
//! - POST /api/v1/auth/sign-in
//! - POST /api/v1/auth/sign-out
//! - GET /api/v1/me

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    error::AppError,
    middleware::auth::{AuthContext, removal_cookie, session_cookie},
    models::user::{SignInRequest, SignUpRequest, User},
    services::user_service,
    state::AppState,
};

/// Create an account and sign the new user in.
///
/// # Response
///
/// - **201 Created**: the stored user, with the session cookie set
/// - **400**: invalid sign-up fields
/// - **409**: email already registered
/// - **502**: identity or payments service failed
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, session) = user_service::sign_up(
        state.identity.as_ref(),
        state.payments.as_ref(),
        state.users.as_ref(),
        request,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(session.secret, state.cookie_secure)),
        Json(user),
    ))
}

/// Sign in with email and password.
///
/// # Request Body
///
/// ```json
/// { "email": "ada@example.com", "password": "correct horse" }
/// ```
///
/// # Response
///
/// - **200 OK**: the user, with the session cookie set
/// - **401**: bad credentials
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, session) =
        user_service::sign_in(state.identity.as_ref(), state.users.as_ref(), request).await?;

    Ok((
        jar.add(session_cookie(session.secret, state.cookie_secure)),
        Json(user),
    ))
}

/// End the current session and clear the cookie.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    user_service::sign_out(state.identity.as_ref(), &auth.session_secret).await?;

    Ok((
        StatusCode::NO_CONTENT,
        jar.remove(removal_cookie()),
    ))
}

/// The signed-in user.
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<User> {
    Json(auth.user)
}
