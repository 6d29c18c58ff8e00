//! Inspection of the backend's session cookie.
//!
//! - [`token::inspect`] -- reads a JWT's expiry without verifying its signature.

pub mod token;
