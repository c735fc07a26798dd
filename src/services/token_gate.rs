// src/services/token_gate.rs
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::db::TokenStore;
use crate::error::AuthError;
use crate::models::jwt::{RefreshRequest, RefreshResponse, TokenPair};
use crate::utils::jwt::{is_expired, now};

/// Hands out a currently valid access token, refreshing it when it is about
/// to expire.
///
/// Refreshes are single-flight: callers that find a stale token while a
/// refresh is running wait for it and pick up the stored result instead of
/// issuing their own request, even when the new token is itself short-lived.
#[derive(Clone)]
pub struct TokenGate {
    store: TokenStore,
    http: Client,
    refresh_url: String,
    skew_secs: i64,
    refresh_lock: Arc<Mutex<()>>,
}

impl TokenGate {
    pub fn new(store: TokenStore, http: Client, config: &ClientConfig) -> Self {
        Self {
            store,
            http,
            refresh_url: config.refresh_url(),
            skew_secs: config.token_skew_secs,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /* ---------- PUBLIC API ---------- */

    /// Returns a usable access token, or the reason the user has to sign in
    /// again. The store is cleared before any terminal failure is returned.
    #[instrument(skip(self))]
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let pair = self.store.get().await.ok_or(AuthError::Unauthenticated)?;

        if !is_expired(&pair.access, self.skew_secs, now()) {
            return Ok(pair.access);
        }

        debug!("Access token stale, refreshing");
        self.refresh_from(&pair.access).await
    }

    /// Refreshes even though the access token still looks valid, for when the
    /// server has rejected `rejected_access`.
    #[instrument(skip_all)]
    pub async fn force_refresh(&self, rejected_access: &str) -> Result<String, AuthError> {
        self.refresh_from(rejected_access).await
    }

    /// Ends the session after the server rejected `rejected_access` even
    /// after a refresh. A pair another caller saved in the meantime is kept.
    #[instrument(skip_all)]
    pub async fn invalidate(&self, rejected_access: &str) {
        let _guard = self.refresh_lock.lock().await;

        match self.store.get().await {
            Some(current) if current.access == rejected_access => {
                warn!("Access token revoked, clearing session");
                self.store.remove().await;
            }
            Some(_) => debug!("Session replaced concurrently, keeping it"),
            None => {}
        }
    }

    /* ---------- PRIVATE HELPERS ---------- */

    async fn refresh_from(&self, stale_access: &str) -> Result<String, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        // re-read: the pair may have been refreshed or cleared while waiting.
        // A different token means a refresh finished after we saw the stale one.
        let current = self.store.get().await.ok_or(AuthError::Unauthenticated)?;
        if current.access != stale_access {
            debug!("Token refreshed by a concurrent caller");
            return Ok(current.access);
        }

        if is_expired(&current.refresh, 0, now()) {
            info!("Refresh token expired, clearing session");
            self.store.remove().await;
            return Err(AuthError::TokenExpiredUnrecoverable);
        }

        match self.request_refresh(&current.refresh).await {
            Ok(pair) => {
                self.store.set(&pair).await;
                info!("Access token refreshed");
                Ok(pair.access)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.store.remove().await;
                Err(e)
            }
        }
    }

    async fn request_refresh(&self, refresh: &str) -> Result<TokenPair, AuthError> {
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh })
            .send()
            .await
            .map_err(AuthError::RefreshTransport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::RefreshRejected { status });
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(AuthError::RefreshTransport)?;

        let access = body
            .access
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;
        // the server may keep the old refresh token instead of rotating it
        let refresh = body
            .refresh
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| refresh.to_string());

        Ok(TokenPair { access, refresh })
    }
}
