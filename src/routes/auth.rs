//! Auth routes: email access codes, session cookie, caller resolution.

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;
use uuid::Uuid;

use crate::services::access::{self, Access, Capability, Role};
use crate::services::email_auth::{self, EmailAuthError};
use crate::services::{ServiceError, session};
use crate::state::AppState;

const COOKIE_NAME: &str = "session_token";

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "code": "E_UNAUTHORIZED", "message": "sign in required" })),
    )
        .into_response()
}

/// Session token from the cookie, falling back to `Authorization: Bearer`.
pub(crate) fn session_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_owned());
        }
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn session_cookie(value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie or bearer token.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(parts) else {
            return Err(unauthorized());
        };

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, &token)
            .await
            .map_err(|e| ServiceError::from(e).into_response())?
            .ok_or_else(unauthorized)?;

        Ok(Self { user, token })
    }
}

/// Authenticated user plus their resolved role and gym.
pub struct Caller {
    pub user: session::SessionUser,
    pub access: Access,
}

impl<S> FromRequestParts<S> for Caller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);
        let access = access::resolve(&app_state.pool, auth.user.id)
            .await
            .map_err(|e| ServiceError::from(e).into_response())?;
        Ok(Self { user: auth.user, access })
    }
}

impl Caller {
    /// Gym for a staff read, or the caller's own member row for members.
    /// A member scope forces list filters down to their own records.
    pub fn read_scope(&self, capability: Capability) -> Result<(Uuid, Option<Uuid>), ServiceError> {
        if self.access.role == Role::Member {
            let (gym_id, member_id) = self.access.require_member()?;
            return Ok((gym_id, Some(member_id)));
        }
        Ok((self.access.require(capability)?, None))
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct RequestCodeBody {
    email: String,
}

/// `POST /api/auth/request-code`: email a one-time access code.
pub async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeBody>,
) -> Result<StatusCode, EmailAuthError> {
    let (email, code) = email_auth::request_access_code(&state.pool, &body.email).await?;
    state.mailer.send_code(&email, &code).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
pub struct VerifyCodeBody {
    email: String,
    code: String,
}

/// `POST /api/auth/verify-code`: exchange a code for a session.
pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<VerifyCodeBody>,
) -> Result<Response, EmailAuthError> {
    let user_id = email_auth::verify_access_code(&state.pool, &body.email, &body.code).await?;
    let ttl_hours = state.config.session_ttl_hours;
    let token = session::create_session(&state.pool, user_id, ttl_hours).await?;
    let user = session::validate_session(&state.pool, &token)
        .await?
        .ok_or(EmailAuthError::VerificationFailed)?;

    let cookie = session_cookie(token.clone(), state.config.cookie_secure, Duration::hours(ttl_hours));
    let jar = jar.add(cookie);
    Ok((jar, Json(serde_json::json!({ "token": token, "user": user })))
        .into_response())
}

/// `GET /api/auth/me`: current user and resolved access.
pub async fn me(caller: Caller) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "user": caller.user, "access": caller.access }))
}

/// `POST /api/auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, "session delete failed");
    }

    let cookie = session_cookie(String::new(), state.config.cookie_secure, Duration::ZERO);
    (CookieJar::new().add(cookie), StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
