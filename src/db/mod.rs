use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::{ClientConfig, StoreBackend};
use crate::error::StoreError;
use crate::models::jwt::TokenPair;

pub mod redis;
pub mod sqlite;
pub use self::redis::RedisStore;
pub use self::sqlite::SqliteStore;

/// Durable string key-value storage, the platform contract the token store
/// is built on.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local backend. Survives nothing; used for tests and throwaway
/// sessions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Opens the backend selected by `config.store`.
pub async fn create_key_value_store(
    config: &ClientConfig,
) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    let store: Arc<dyn KeyValueStore> = match config.store {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteStore::connect(&config.database_url).await?),
        StoreBackend::Redis => Arc::new(RedisStore::new(&config.redis_url)?),
    };
    info!(backend = ?config.store, "Key-value store ready");
    Ok(store)
}

/// The single persistent slot holding the session's token pair.
///
/// Backend and decoding failures never reach the caller: a value that cannot
/// be read is reported as absent, and failed writes are logged.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    pub async fn get(&self) -> Option<TokenPair> {
        let raw = match self.backend.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!(error = %e, "Failed to read stored tokens");
                return None;
            }
        };

        match serde_json::from_str::<TokenPair>(&raw) {
            Ok(pair) if pair.is_well_formed() => Some(pair),
            Ok(_) => {
                warn!("Stored token pair is missing a token, treating as signed out");
                None
            }
            Err(e) => {
                warn!(error = %e, "Stored token value is not a token pair, treating as signed out");
                None
            }
        }
    }

    pub async fn set(&self, pair: &TokenPair) {
        let value = match serde_json::to_string(pair) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Failed to serialize token pair");
                return;
            }
        };
        if let Err(e) = self.backend.set(&self.key, &value).await {
            error!(error = %e, "Failed to persist tokens");
        }
    }

    pub async fn remove(&self) {
        if let Err(e) = self.backend.remove(&self.key).await {
            error!(error = %e, "Failed to remove stored tokens");
        }
    }
}
