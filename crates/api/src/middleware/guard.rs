//! Edge route guard.
//!
//! Requests for protected pages must carry the backend's `auth_token`
//! cookie, and the backend must still accept it. Anything else is
//! redirected to the login page with an error code and the original path.
//! This check never consults client-side session state.

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use iching_client::backend::{BackendClient, AUTH_COOKIE};
use iching_client::error::ApiError;
use iching_core::login_errors::LoginErrorCode;
use iching_core::routes::{canonical_path, is_protected_route, login_redirect};

use crate::auth::token::{self, TokenShape};
use crate::state::AppState;

/// Asks the backend whether a session token is still valid.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// `Ok(false)` when the backend rejects the token, `Err` when it cannot
    /// be asked.
    async fn validate(&self, token: &str) -> Result<bool, ApiError>;
}

#[async_trait]
impl TokenValidator for BackendClient {
    async fn validate(&self, token: &str) -> Result<bool, ApiError> {
        self.validate_token_cookie(token).await
    }
}

/// Axum middleware: pass unprotected paths through, check the rest.
pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    // Classify the path the static file server would resolve, not the raw one.
    let path = canonical_path(request.uri().path());
    if !is_protected_route(&path) {
        return next.run(request).await;
    }

    let target = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };

    match check_session(&state, request.headers()).await {
        Ok(()) => next.run(request).await,
        Err(code) => {
            tracing::info!(path = %target, code = code.as_str(), "Redirecting to login");
            Redirect::temporary(&login_redirect(Some(code), Some(&target))).into_response()
        }
    }
}

async fn check_session(state: &AppState, headers: &HeaderMap) -> Result<(), LoginErrorCode> {
    let token = session_cookie(headers).ok_or(LoginErrorCode::Unauthorized)?;

    if token::inspect(&token, chrono::Utc::now().timestamp()) == TokenShape::Expired {
        return Err(LoginErrorCode::SessionExpired);
    }

    match state.token_validator.validate(&token).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(LoginErrorCode::InvalidToken),
        Err(e) => {
            tracing::warn!(error = %e, "Token validation unavailable");
            Err(LoginErrorCode::ServerError)
        }
    }
}

/// The non-empty `auth_token` value from the request's cookies.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
