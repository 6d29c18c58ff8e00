pub mod health;

use axum::routing::get;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::handlers::{hexagram, login_errors};
use crate::middleware::guard::route_guard;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// GET /hexagrams?first=&second=&third=      derive a divination
/// GET /login-errors                         code-to-message table
/// GET /login-errors/{code}                  message for one code
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/hexagrams", get(hexagram::get_divination))
        .route("/login-errors", get(login_errors::list_login_errors))
        .route("/login-errors/{code}", get(login_errors::get_login_error))
}

/// Health, API, and page routes with the route guard applied.
///
/// Pages are served from `config.static_dir` when set; unknown paths fall
/// back to its `index.html` so client-side routes resolve. Without a static
/// directory, unmatched paths are 404s, but protected paths are still guarded.
pub fn app_routes(state: AppState) -> Router {
    let router = Router::new()
        .merge(health::router())
        .nest("/api/v1", api_routes());

    let router = match &state.config.static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router,
    };

    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            route_guard,
        ))
        .with_state(state)
}
