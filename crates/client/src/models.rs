//! Wire types for the backend API.
//!
//! Request payloads derive [`Validate`] so malformed input is rejected before
//! any network call is made.

use iching_core::types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub email_confirmed_at: Option<Timestamp>,
}

/// Session metadata mirrored on the client.
///
/// The authoritative tokens live in httpOnly cookies, so every field is
/// optional: some endpoints only report expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Expiry as a Unix timestamp.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user: User,
    #[serde(default)]
    pub session: Session,
}

/// `{ "status": ..., "data": ... }` envelope used by the auth endpoints.
/// Only `data` is read; success is decided by the HTTP status.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Result of a sign-up. `session` is absent while email confirmation is pending.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignUpOutcome {
    pub user: User,
    #[serde(default)]
    pub session: Option<Session>,
}

/// Body of `GET /api/auth/me`.
#[derive(Debug, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub session: Option<Session>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(rename = "rememberMe", skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
#[validate(schema(function = "validate_change_authority"))]
pub struct PasswordChangeRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    /// Recovery token from a reset link, used instead of the current password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// A password change must prove authority with the old password or a reset token.
fn validate_change_authority(req: &PasswordChangeRequest) -> Result<(), ValidationError> {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
    if present(&req.current_password) || present(&req.access_token) {
        Ok(())
    } else {
        Err(ValidationError::new("authority")
            .with_message("Current password is required".into()))
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

// ---------------------------------------------------------------------------
// Divination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ReadingRequest {
    #[validate(range(min = 0, max = 999, message = "Numbers must be between 0 and 999"))]
    pub first_number: i64,
    #[validate(range(min = 0, max = 999, message = "Numbers must be between 0 and 999"))]
    pub second_number: i64,
    #[validate(range(min = 0, max = 999, message = "Numbers must be between 0 and 999"))]
    pub third_number: i64,
    #[validate(length(min = 1, max = 500, message = "Question must be 1 to 500 characters"))]
    pub question: String,
    #[validate(length(min = 2, max = 10, message = "Unsupported language"))]
    pub language: String,
}

/// AI-generated reading returned by the oracle endpoint.
///
/// Only the commonly rendered fields are typed; the rest is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IChingPrediction {
    #[serde(default)]
    pub top: Option<String>,
    #[serde(default)]
    pub bottom: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default)]
    pub advice: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveReadingRequest {
    pub first_number: i64,
    pub second_number: i64,
    pub third_number: i64,
    pub question: String,
    pub language: String,
    pub prediction: IChingPrediction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedReading {
    pub id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct UpdateReadingRequest {
    #[validate(length(min = 1, message = "Reading id is required"))]
    pub id: String,
    #[validate(length(min = 1, max = 500, message = "Question must be 1 to 500 characters"))]
    pub clarifying_question: String,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClarificationAnswer {
    pub clarifying_answer: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Reading history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reading {
    pub id: String,
    pub user_id: UserId,
    pub question: String,
    pub first_number: i64,
    pub second_number: i64,
    pub third_number: i64,
    pub language: String,
    pub prediction: serde_json::Value,
    #[serde(default)]
    pub clarifying_question: Option<String>,
    #[serde(default)]
    pub clarifying_answer: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadingPage {
    pub items: Vec<Reading>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    #[serde(default)]
    pub total_pages: Option<i64>,
}

/// Query for `GET /api/user/readings`.
#[derive(Debug, Clone, Serialize)]
pub struct ReadingQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for ReadingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub membership_type: Option<String>,
    #[serde(default)]
    pub premium_expiration: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpgradeRequest {
    pub membership_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Quota {
    #[serde(default)]
    pub membership_type: Option<String>,
    pub remaining_queries: i64,
    #[serde(default)]
    pub total_queries: Option<i64>,
    #[serde(default)]
    pub reset_at: Option<Timestamp>,
}
