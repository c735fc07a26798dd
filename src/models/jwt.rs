// src/models/jwt.rs
use serde::{Deserialize, Serialize};

/// The stored session credentials. Serialized as `{"access": .., "refresh": ..}`
/// under the store's token key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// A pair is only usable with both halves present.
    pub fn is_well_formed(&self) -> bool {
        !self.access.is_empty() && !self.refresh.is_empty()
    }
}

/// Payload claims read from a server-issued token. Only `exp` is required;
/// the rest are carried when the server includes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub exp: i64,               // expiration time, seconds since epoch
    #[serde(default)]
    pub iat: Option<i64>,       // issued at
    #[serde(default)]
    pub token_type: Option<String>, // "access" | "refresh"
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Body of a successful refresh. The server may or may not rotate the
/// refresh token.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}
