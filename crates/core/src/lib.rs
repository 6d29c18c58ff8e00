//! Pure domain logic for the I Ching divination product.
//!
//! Nothing in this crate performs I/O; it is shared by the session client
//! and the edge gateway.

pub mod error;
pub mod hexagram;
pub mod login_errors;
pub mod routes;
pub mod types;
