//! Backend API errors, decoded once at the HTTP boundary.
//!
//! Every non-2xx response and every transport failure becomes an [`ApiError`]
//! with one of five kinds. Call sites match on the kind instead of probing
//! response payloads.

use serde_json::Value;

/// Shown for transport failures and malformed responses.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to reach the server. Please check your connection and try again.";

/// Shown for 5xx responses.
pub const SERVER_ERROR_MESSAGE: &str = "The server encountered an error. Please try again later.";

/// Shown when nothing more specific is available.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Body fields checked for a human-readable message, in precedence order.
const MESSAGE_FIELDS: [&str; 4] = ["detail", "errors", "message", "error_description"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Validation,
    Auth,
    Network,
    Server,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Rejected input: caught client-side or a 400/422 from the backend.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Rejected credentials or an invalid/expired session (401/403).
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Backend unreachable, timed out, or returned a malformed body.
    #[error("Network error: {0}")]
    Network(String),

    /// Backend returned a 5xx status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status.
    #[error("Unexpected response ({status}): {message}")]
    Unknown { status: u16, message: String },
}

impl ApiError {
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Validation(_) => ApiErrorKind::Validation,
            ApiError::Auth { .. } => ApiErrorKind::Auth,
            ApiError::Network(_) => ApiErrorKind::Network,
            ApiError::Server { .. } => ApiErrorKind::Server,
            ApiError::Unknown { .. } => ApiErrorKind::Unknown,
        }
    }

    /// The HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. }
            | ApiError::Server { status, .. }
            | ApiError::Unknown { status, .. } => Some(*status),
            ApiError::Validation(_) | ApiError::Network(_) => None,
        }
    }

    /// Copy suitable for an inline alert next to a form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Auth { message, .. } | ApiError::Unknown { message, .. } => message.clone(),
            ApiError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            ApiError::Server { .. } => SERVER_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Auth { status: 401, .. })
    }

    /// Decode a non-success response into an error.
    ///
    /// The body is parsed as JSON when possible and searched for a message in
    /// `detail`, `errors`, `message`, `error_description` order. A non-JSON
    /// body falls back to the generic copy.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| extract_message(&v))
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());

        match status {
            400 | 422 => ApiError::Validation(message),
            401 | 403 => ApiError::Auth { status, message },
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Unknown { status, message },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Network(format!("Malformed response: {err}"))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                    (field.clone(), msg)
                })
            })
            .collect();
        messages.sort();
        let joined = messages
            .into_iter()
            .map(|(_, msg)| msg)
            .collect::<Vec<_>>()
            .join("; ");
        ApiError::Validation(joined)
    }
}

/// Find the first human-readable message in a structured error body.
pub fn extract_message(body: &Value) -> Option<String> {
    MESSAGE_FIELDS
        .iter()
        .filter_map(|field| body.get(field))
        .find_map(value_text)
}

/// Flatten a message-bearing JSON value into text.
///
/// Strings are used as-is; arrays and objects are joined, and objects with a
/// `msg` or `message` field contribute that field.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => {
            if let Some(inner) = map.get("msg").or_else(|| map.get("message")) {
                return value_text(inner);
            }
            map.values()
                .filter_map(value_text)
                .collect::<Vec<_>>()
                .join("; ")
        }
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}
