use http::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{ApiError, AuthError, FieldErrors};
use crate::services::session::SessionManager;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const GENERIC_FAILURE: &str = "Something went wrong, please try again";
const MESSAGE_KEYS: [&str; 3] = ["detail", "error", "message"];

/// Issues authenticated JSON calls against the backend.
///
/// Every call gets its access token from the session's gate first; when
/// there is no usable session the call fails with
/// `ApiError::Unauthenticated` and nothing is sent.
#[derive(Clone)]
pub struct ApiClient {
    session: SessionManager,
}

impl ApiClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /* ---------- PUBLIC API ---------- */

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        self.send(Method::GET, path, &[], None::<&()>, cancel).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        self.send(Method::GET, path, query, None::<&()>, cancel).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, &[], Some(body), cancel).await
    }

    /// POST with an empty JSON object, for action endpoints that take no input.
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        self.post(path, &serde_json::Map::new(), cancel).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B, cancel: &CancellationToken) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PATCH, path, &[], Some(body), cancel).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        self.send(Method::DELETE, path, &[], None::<&()>, cancel).await
    }

    /// Performs one business call. A 401 from the server triggers one forced
    /// refresh and a single retry; a second 401 ends the session.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        // not raced against `cancel`: a refresh in flight must finish and persist
        let token = self.session.access_token().await?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let (status, bytes) = self.dispatch(&method, path, query, body, &token, cancel).await?;
        if status != StatusCode::UNAUTHORIZED {
            return finish(status, &bytes);
        }

        info!("Access token rejected by server, refreshing and retrying once");
        let token = self.session.force_refresh(&token).await?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let (status, bytes) = self.dispatch(&method, path, query, body, &token, cancel).await?;
        if status == StatusCode::UNAUTHORIZED {
            warn!("Refreshed token rejected as well, ending session");
            self.session.invalidate(&token).await;
            return Err(AuthError::Revoked.into());
        }
        finish(status, &bytes)
    }

    /* ---------- PRIVATE HELPERS ---------- */

    async fn dispatch<B: Serialize + ?Sized>(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<(StatusCode, Vec<u8>), ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let mut request = self
            .session
            .http()
            .request(method.clone(), self.session.config().url(path))
            .bearer_auth(token)
            .header(REQUEST_ID_HEADER, &request_id);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            response = request.send() => response.map_err(ApiError::from_transport)?,
        };
        let status = response.status();
        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            bytes = read_body(response) => bytes.map_err(ApiError::from_transport)?,
        };

        // cancelled while the body was arriving: drop it
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        debug!(request_id = %request_id, status = %status, "Response received");
        Ok((status, bytes))
    }
}

pub(crate) async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, reqwest::Error> {
    Ok(response.bytes().await?.to_vec())
}

fn finish<T: DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<T, ApiError> {
    if !status.is_success() {
        warn!(status = %status, "Request rejected");
        return Err(error_from_body(status, bytes, GENERIC_FAILURE));
    }
    decode_body(bytes)
}

/// Decodes a success body. An empty body decodes as JSON `null`, so
/// `Option<_>` targets read it as `None`.
pub(crate) fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Builds a structured error from a non-2xx body.
///
/// The message is taken from `detail`, `error` or `message`, then from the
/// first field error, then `fallback`. Each other key maps to its first
/// message, as in `{"email": ["Enter a valid email."]}`.
pub fn error_from_body(status: StatusCode, bytes: &[u8], fallback: &str) -> ApiError {
    let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(bytes) else {
        return ApiError::Rejected {
            status,
            message: fallback.to_string(),
            fields: FieldErrors::new(),
        };
    };

    let mut fields = FieldErrors::new();
    for (key, value) in &map {
        if MESSAGE_KEYS.contains(&key.as_str()) {
            continue;
        }
        let first = match value {
            Value::Array(items) => items.iter().find_map(Value::as_str),
            Value::String(text) => Some(text.as_str()),
            _ => None,
        };
        if let Some(first) = first {
            fields.insert(key.clone(), first.to_string());
        }
    }

    let message = MESSAGE_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(message_text))
        .or_else(|| fields.values().next().cloned())
        .unwrap_or_else(|| fallback.to_string());

    ApiError::Rejected {
        status,
        message,
        fields,
    }
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(Value::as_str).map(str::to_string),
        _ => None,
    }
}
