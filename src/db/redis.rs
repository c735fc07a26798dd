use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{error, info, instrument};

use super::KeyValueStore;
use crate::error::StoreError;

/// Key-value slots in Redis, for deployments where the client runs as a
/// long-lived service next to a Redis instance.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    #[instrument]
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        info!(url = %redis_url, "Initializing Redis connection");

        match Client::open(redis_url) {
            Ok(client) => {
                info!("Redis client successfully created");
                Ok(Self { client })
            }
            Err(e) => {
                error!(error = %e, "Failed to create Redis client");
                Err(e.into())
            }
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        match self.client.get_multiplexed_async_connection().await {
            Ok(con) => Ok(con),
            Err(e) => {
                error!(error = %e, "Failed to get Redis connection");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut con = self.connection().await?;
        match con.get::<_, Option<String>>(key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                error!(error = %e, "Failed to read key from Redis");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        if let Err(e) = con.set::<_, _, ()>(key, value).await {
            error!(error = %e, "Failed to write key to Redis");
            return Err(e.into());
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        if let Err(e) = con.del::<_, ()>(key).await {
            error!(error = %e, "Failed to delete key from Redis");
            return Err(e.into());
        }
        Ok(())
    }
}
