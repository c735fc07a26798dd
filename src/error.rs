use std::collections::BTreeMap;

use http::StatusCode;
use thiserror::Error;

/// Failure of a key-value backend. Never escapes `TokenStore`; it is logged
/// there and mapped to "no session".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite store error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("sqlite migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("redis store error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Why the token gate could not produce an access token.
///
/// Every variant means the same thing to a caller: abandon the pending
/// request and send the user to sign-in. The variants only exist so the
/// cause can be logged.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no stored session")]
    Unauthenticated,
    #[error("access and refresh tokens are both expired")]
    TokenExpiredUnrecoverable,
    #[error("refresh endpoint rejected the refresh token with status {status}")]
    RefreshRejected { status: StatusCode },
    #[error("refresh request failed: {0}")]
    RefreshTransport(#[source] reqwest::Error),
    #[error("refresh response did not contain an access token")]
    MissingAccessToken,
    #[error("access token rejected by the server after refresh")]
    Revoked,
}

/// Field name to first validation message, as rendered next to form inputs.
pub type FieldErrors = BTreeMap<String, String>;

/// Error surfaced by the authenticated request helper and the auth flows.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("sign-in required: {0}")]
    Unauthenticated(#[from] AuthError),
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        message: String,
        fields: FieldErrors,
    },
    #[error("invalid input")]
    Validation(FieldErrors),
    #[error("request cancelled")]
    Cancelled,
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// True when the caller should route the user to sign-in.
    pub fn needs_login(&self) -> bool {
        matches!(self, ApiError::Unauthenticated(_))
    }

    /// Sorts a reqwest failure into `Timeout` or `Transport`.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(error)
        }
    }

    /// Field-level messages for form rendering.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Rejected { fields, .. } | ApiError::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Error from the task board. Local state is left untouched whenever one is
/// returned.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("task {0} is not on the board")]
    UnknownTask(i64),
    #[error(transparent)]
    Api(#[from] ApiError),
}
