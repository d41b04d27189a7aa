//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the JSON API. Every `/api` route except the login pair requires a
//! session; handlers receive a resolved `Caller` and check a capability
//! before delegating to a service. Service errors become
//! `{"code", "message"}` bodies with a matching status.

pub mod activity;
pub mod attendance;
pub mod auth;
pub mod dashboard;
pub mod expenses;
pub mod follow_ups;
pub mod gyms;
pub mod members;
pub mod memberships;
pub mod packages;
pub mod payments;
pub mod refunds;
pub mod staff;
pub mod training;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::services::email_auth::EmailAuthError;
use crate::services::{ErrorCode, ServiceError};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/auth/request-code", post(auth::request_code))
        .route("/api/auth/verify-code", post(auth::verify_code))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/gyms", post(gyms::create_gym))
        .route("/api/gyms/current", get(gyms::current_gym).patch(gyms::update_gym))
        .route("/api/members", get(members::list_members).post(members::create_member))
        .route(
            "/api/members/{id}",
            get(members::get_member)
                .patch(members::update_member)
                .delete(members::delete_member),
        )
        .route("/api/me/member", get(members::my_profile))
        .route("/api/staff", get(staff::list_staff).post(staff::create_staff))
        .route(
            "/api/staff/{id}",
            get(staff::get_staff).patch(staff::update_staff).delete(staff::delete_staff),
        )
        .route("/api/packages", get(packages::list_packages).post(packages::create_package))
        .route(
            "/api/packages/{id}",
            get(packages::get_package)
                .patch(packages::update_package)
                .delete(packages::delete_package),
        )
        .route(
            "/api/memberships",
            get(memberships::list_memberships).post(memberships::create_membership),
        )
        .route("/api/memberships/{id}", get(memberships::get_membership))
        .route("/api/memberships/{id}/cancel", post(memberships::cancel_membership))
        .route("/api/payments", get(payments::list_payments).post(payments::create_payment))
        .route("/api/payments/{id}", get(payments::get_payment))
        .route("/api/refunds", get(refunds::list_refunds).post(refunds::create_refund))
        .route("/api/refunds/{id}", get(refunds::get_refund))
        .route("/api/refunds/{id}/review", post(refunds::review_refund))
        .route(
            "/api/follow-ups",
            get(follow_ups::list_follow_ups).post(follow_ups::create_follow_up),
        )
        .route(
            "/api/follow-ups/{id}",
            patch(follow_ups::update_follow_up).delete(follow_ups::delete_follow_up),
        )
        .route("/api/follow-ups/{id}/complete", post(follow_ups::complete_follow_up))
        .route(
            "/api/training-sessions",
            get(training::list_sessions).post(training::create_session),
        )
        .route(
            "/api/training-sessions/{id}",
            get(training::get_session)
                .patch(training::update_session)
                .delete(training::delete_session),
        )
        .route("/api/expenses", get(expenses::list_expenses).post(expenses::create_expense))
        .route("/api/expenses/summary", get(expenses::expense_summary))
        .route("/api/expenses/{id}", axum::routing::delete(expenses::delete_expense))
        .route("/api/activity", get(activity::list_activity))
        .route("/api/attendance", get(attendance::list_visits))
        .route("/api/attendance/occupancy", get(attendance::occupancy))
        .route("/api/attendance/check-in", post(attendance::check_in))
        .route("/api/attendance/check-out", post(attendance::check_out))
        .route("/api/attendance/auto-checkout", post(attendance::run_auto_checkout))
        .route("/api/dashboard", get(dashboard::dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

pub(crate) fn service_error_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn email_auth_error_status(err: &EmailAuthError) -> StatusCode {
    match err {
        EmailAuthError::InvalidEmail | EmailAuthError::InvalidCode => StatusCode::BAD_REQUEST,
        EmailAuthError::VerificationFailed => StatusCode::UNAUTHORIZED,
        EmailAuthError::Delivery(_) => StatusCode::BAD_GATEWAY,
        EmailAuthError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(status: StatusCode, err: &impl ErrorCode) -> Response {
    // Internal errors are logged in full but not echoed to clients.
    let message = if status.is_server_error() {
        error!(error = %err, code = err.error_code(), "request failed");
        "internal error".to_owned()
    } else {
        err.to_string()
    };
    (status, Json(serde_json::json!({ "code": err.error_code(), "message": message }))).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        error_body(service_error_status(&self), &self)
    }
}

impl IntoResponse for EmailAuthError {
    fn into_response(self) -> Response {
        error_body(email_auth_error_status(&self), &self)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
