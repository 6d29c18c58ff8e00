//! Edge server for the I Ching front end.
//!
//! Guards protected pages against the backend's session cookie, serves the
//! hexagram derivation and login-error lookups as JSON, and falls back to the
//! static front-end bundle. Exposed as a library so integration tests and the
//! binary entrypoint build the same router.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
