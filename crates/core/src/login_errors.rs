//! Error codes carried in `/login?error=<code>` redirects.
//!
//! The edge guard and the session store redirect with one of these codes; the
//! login page renders the matching message from a fixed lookup table.

use serde::{Deserialize, Serialize};

/// Fallback copy for codes not in the table.
pub const GENERIC_LOGIN_ERROR: &str = "An unexpected error occurred. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginErrorCode {
    /// No session cookie on a protected route.
    Unauthorized,
    /// The access token's expiry has passed.
    SessionExpired,
    /// The backend rejected the token.
    InvalidToken,
    /// The backend could not be reached to validate the session.
    ServerError,
    /// The account exists but the email address is unconfirmed.
    EmailNotConfirmed,
}

impl LoginErrorCode {
    pub const ALL: [LoginErrorCode; 5] = [
        LoginErrorCode::Unauthorized,
        LoginErrorCode::SessionExpired,
        LoginErrorCode::InvalidToken,
        LoginErrorCode::ServerError,
        LoginErrorCode::EmailNotConfirmed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoginErrorCode::Unauthorized => "unauthorized",
            LoginErrorCode::SessionExpired => "session_expired",
            LoginErrorCode::InvalidToken => "invalid_token",
            LoginErrorCode::ServerError => "server_error",
            LoginErrorCode::EmailNotConfirmed => "email_not_confirmed",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    pub fn message(self) -> &'static str {
        match self {
            LoginErrorCode::Unauthorized => "Please log in to continue.",
            LoginErrorCode::SessionExpired => "Your session has expired. Please log in again.",
            LoginErrorCode::InvalidToken => {
                "Your session is no longer valid. Please log in again."
            }
            LoginErrorCode::ServerError => {
                "We could not verify your session. Please try again in a moment."
            }
            LoginErrorCode::EmailNotConfirmed => {
                "Please confirm your email address before logging in."
            }
        }
    }
}

/// Human-readable copy for a raw `error` query value.
pub fn message_for_code(code: &str) -> &'static str {
    LoginErrorCode::parse(code)
        .map(LoginErrorCode::message)
        .unwrap_or(GENERIC_LOGIN_ERROR)
}
