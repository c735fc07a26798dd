use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use crate::models::jwt::TokenClaims;

/// Current time in seconds since the epoch.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Reads the claims from a token's payload segment.
///
/// The client never holds the server's signing key, so the signature is not
/// checked here; the server verifies it on every request. Returns `None` for
/// anything that is not a structurally valid token with an `exp` claim.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    match decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            debug!(error = %e, "Failed to decode token claims");
            None
        }
    }
}

pub fn expires_at(token: &str) -> Option<i64> {
    decode_claims(token).map(|claims| claims.exp)
}

/// A token is usable while `now < exp - skew_secs`. Undecodable tokens count
/// as expired.
pub fn is_expired(token: &str, skew_secs: i64, now: i64) -> bool {
    match expires_at(token) {
        Some(exp) => now >= exp - skew_secs,
        None => true,
    }
}
