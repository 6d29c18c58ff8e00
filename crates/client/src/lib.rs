//! Client-side session core for the I Ching divination front-end.
//!
//! - [`backend`] -- HTTP client for the external backend API.
//! - [`error`] -- [`ApiError`](error::ApiError), decoded once at the HTTP boundary.
//! - [`cache`] -- Encrypted, fail-closed local session cache.
//! - [`store`] -- The session reconciliation state machine.

pub mod backend;
pub mod cache;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod models;
pub mod storage;
pub mod store;
