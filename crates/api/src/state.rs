use std::sync::Arc;

use crate::config::ServerConfig;
use crate::middleware::guard::TokenValidator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Decides whether an `auth_token` cookie is still accepted by the backend.
    pub token_validator: Arc<dyn TokenValidator>,
}
