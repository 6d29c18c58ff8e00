//! Lookup of the copy shown for `/login?error=<code>` redirects.

use axum::extract::Path;
use axum::Json;
use iching_core::error::CoreError;
use iching_core::login_errors::LoginErrorCode;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;

#[derive(Debug, Serialize)]
pub struct LoginErrorMessage {
    pub code: LoginErrorCode,
    pub message: &'static str,
}

/// GET /api/v1/login-errors
///
/// The full code-to-message table.
pub async fn list_login_errors() -> Json<DataResponse<Vec<LoginErrorMessage>>> {
    let data = LoginErrorCode::ALL
        .into_iter()
        .map(|code| LoginErrorMessage {
            code,
            message: code.message(),
        })
        .collect();
    Json(DataResponse { data })
}

/// GET /api/v1/login-errors/{code}
pub async fn get_login_error(
    Path(code): Path<String>,
) -> AppResult<Json<DataResponse<LoginErrorMessage>>> {
    let parsed = LoginErrorCode::parse(&code).ok_or(CoreError::NotFound {
        entity: "Login error code",
        id: code,
    })?;
    Ok(Json(DataResponse {
        data: LoginErrorMessage {
            code: parsed,
            message: parsed.message(),
        },
    }))
}
