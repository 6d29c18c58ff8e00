//! Request middleware.
//!
//! - [`guard::route_guard`] -- Redirects unauthenticated requests for protected pages to login.

pub mod guard;
