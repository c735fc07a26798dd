use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::api::client::{error_from_body, read_body};
use crate::config::ClientConfig;
use crate::db::{KeyValueStore, TokenStore, create_key_value_store};
use crate::error::{ApiError, AuthError};
use crate::models::jwt::{RefreshRequest, TokenPair};
use crate::models::user::{Credentials, LoginResponse, RegisterResponse, Registration, SessionUser, UserProfile};
use crate::services::token_gate::TokenGate;

pub const LOGIN_PATH: &str = "/api/login/";
pub const REGISTER_PATH: &str = "/api/register/";
pub const LOGOUT_PATH: &str = "/api/logout/logout/";

/// Owns the session: the token store, the token gate and the sign-in,
/// sign-up and sign-out flows. Everything that talks to the backend goes
/// through one of these.
#[derive(Clone)]
pub struct SessionManager {
    config: Arc<ClientConfig>,
    http: Client,
    store: TokenStore,
    gate: TokenGate,
}

impl SessionManager {
    pub fn new(config: ClientConfig, backend: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(format!("questlog-client/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let store = TokenStore::new(backend, config.token_key.clone());
        let gate = TokenGate::new(store.clone(), http.clone(), &config);

        Ok(Self {
            config: Arc::new(config),
            http,
            store,
            gate,
        })
    }

    /// Opens the configured store backend and builds a manager on it.
    pub async fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let backend = create_key_value_store(&config).await?;
        Self::new(config, backend)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub async fn access_token(&self) -> Result<String, AuthError> {
        self.gate.access_token().await
    }

    pub async fn force_refresh(&self, rejected_access: &str) -> Result<String, AuthError> {
        self.gate.force_refresh(rejected_access).await
    }

    pub async fn invalidate(&self, rejected_access: &str) {
        self.gate.invalidate(rejected_access).await
    }

    /// Startup check: whether a stored session is usable, refreshing it if
    /// needed. A `false` means the app should show sign-in.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> bool {
        match self.gate.access_token().await {
            Ok(_) => {
                info!("Restored existing session");
                true
            }
            Err(e) => {
                info!(reason = %e, "No usable session");
                false
            }
        }
    }

    /// Keeps the session warm in the background: every `period` the access
    /// token is checked and refreshed if it has gone stale. Stops when
    /// `cancel` fires or the session ends.
    pub fn spawn_keepalive(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => {
                        debug!("Keepalive cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = session.gate.access_token().await {
                            info!(reason = %e, "Session ended, stopping keepalive");
                            break;
                        }
                    }
                }
            }
        })
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<SessionUser>, ApiError> {
        credentials.validate().map_err(ApiError::Validation)?;

        let (status, body) = self.post_public(LOGIN_PATH, credentials).await?;
        if !status.is_success() {
            warn!(status = %status, "Login rejected");
            return Err(error_from_body(status, &body, "Invalid email or password"));
        }

        let response: LoginResponse = serde_json::from_slice(&body)?;
        let pair = match (response.access, response.refresh) {
            (Some(access), Some(refresh)) => TokenPair::new(access, refresh),
            _ => {
                error!("Login response did not contain both tokens");
                return Err(ApiError::UnexpectedResponse(
                    "login response is missing tokens".into(),
                ));
            }
        };
        if !pair.is_well_formed() {
            return Err(ApiError::UnexpectedResponse(
                "login response contains an empty token".into(),
            ));
        }

        self.store.set(&pair).await;
        info!("Login successful");
        Ok(response.user)
    }

    /// Creates an account. Does not sign in; the caller sends the user to the
    /// sign-in flow afterwards.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<Option<UserProfile>, ApiError> {
        registration.validate().map_err(ApiError::Validation)?;

        let (status, body) = self.post_public(REGISTER_PATH, registration).await?;
        if !status.is_success() {
            warn!(status = %status, "Registration rejected");
            return Err(error_from_body(status, &body, "Registration failed"));
        }

        let response: RegisterResponse = if body.is_empty() {
            RegisterResponse { user: None }
        } else {
            serde_json::from_slice(&body)?
        };
        info!("Registration successful");
        Ok(response.user)
    }

    /// Signs out: tells the server to revoke the refresh token when there is
    /// one, then clears the store whatever the server said.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(pair) = self.store.get().await {
            let request = self
                .http
                .post(self.config.url(LOGOUT_PATH))
                .bearer_auth(&pair.access)
                .json(&RefreshRequest { refresh: &pair.refresh })
                .send()
                .await;
            match request {
                Ok(response) if response.status().is_success() => info!("Server session revoked"),
                Ok(response) => warn!(status = %response.status(), "Server refused logout"),
                Err(e) => warn!(error = %e, "Logout request failed"),
            }
        }
        self.store.remove().await;
        info!("Signed out");
    }

    async fn post_public<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(http::StatusCode, Vec<u8>), ApiError> {
        let response = self
            .http
            .post(self.config.url(path))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        let status = response.status();
        let body = read_body(response).await.map_err(ApiError::from_transport)?;
        Ok((status, body))
    }
}
