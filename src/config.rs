use std::env;
use std::time::Duration;

use dotenv::dotenv;
use tracing::{info, warn};

pub const DEFAULT_API_BASE: &str = "https://todolister-edw1.onrender.com";
pub const DEFAULT_REFRESH_PATH: &str = "/api/login/refresh/";
pub const DEFAULT_TOKEN_KEY: &str = "token";
pub const DEFAULT_TOKEN_SKEW_SECS: i64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which key-value backend holds the token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sqlite,
    Redis,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub refresh_path: String,
    pub token_key: String,
    /// Seconds subtracted from an access token's `exp` before it is trusted.
    pub token_skew_secs: i64,
    pub request_timeout: Duration,
    pub store: StoreBackend,
    pub database_url: String,
    pub redis_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            token_skew_secs: DEFAULT_TOKEN_SKEW_SECS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            store: StoreBackend::Sqlite,
            database_url: "sqlite:questlog.db?mode=rwc".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the process environment, loading a
    /// `.env` file first when one exists. Unset or unparseable variables fall
    /// back to the defaults.
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        let store = match env::var("TOKEN_STORE") {
            Ok(value) => StoreBackend::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "Unknown TOKEN_STORE, using sqlite");
                StoreBackend::Sqlite
            }),
            Err(_) => defaults.store,
        };

        let config = Self {
            api_base: env::var("API_BASE").unwrap_or(defaults.api_base),
            refresh_path: env::var("REFRESH_PATH").unwrap_or(defaults.refresh_path),
            token_key: defaults.token_key,
            token_skew_secs: parse_var("TOKEN_SKEW_SECS").unwrap_or(defaults.token_skew_secs),
            request_timeout: parse_var("REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            store,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
        };

        info!(
            api_base = %config.api_base,
            store = ?config.store,
            skew_secs = config.token_skew_secs,
            "Loaded client configuration"
        );
        config
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_token_skew_secs(mut self, skew: i64) -> Self {
        self.token_skew_secs = skew;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_store(mut self, store: StoreBackend) -> Self {
        self.store = store;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// Joins a path such as `/api/tasks/` onto the API base.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn refresh_url(&self) -> String {
        self.url(&self.refresh_path)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}
