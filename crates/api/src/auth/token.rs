//! Expiry check for access tokens issued by the backend.
//!
//! The edge does not hold the backend's signing key, so it cannot verify a
//! token. It only reads the `exp` claim to short-circuit obviously expired
//! sessions; the signature is left to the backend's validate endpoint.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

/// Claims read from an unverified access token.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PeekedClaims {
    /// Subject, when present.
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiration time (UTC Unix timestamp), when present.
    #[serde(default)]
    pub exp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    /// A JWT whose `exp` is at or before the given instant.
    Expired,
    /// A JWT that has not expired, or carries no `exp`.
    Live,
    /// Not a decodable JWT. Only the backend can judge it.
    Opaque,
}

/// Decode the claims without checking the signature or any time claim.
pub fn peek_claims(token: &str) -> Result<PeekedClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<PeekedClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(token_data.claims)
}

/// Classify `token` against `now` (UTC Unix timestamp).
pub fn inspect(token: &str, now: i64) -> TokenShape {
    match peek_claims(token) {
        Ok(PeekedClaims { exp: Some(exp), .. }) if exp <= now => TokenShape::Expired,
        Ok(_) => TokenShape::Live,
        Err(e) => {
            tracing::debug!(error = %e, "Session cookie is not a readable JWT");
            TokenShape::Opaque
        }
    }
}
