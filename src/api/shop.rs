use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::client::ApiClient;
use crate::error::ApiError;
use crate::models::Ack;
use crate::models::shop::ShopItem;

pub const SHOP_PATH: &str = "/api/shop/";

impl ApiClient {
    pub async fn list_shop(&self, cancel: &CancellationToken) -> Result<Vec<ShopItem>, ApiError> {
        self.get(SHOP_PATH, cancel).await
    }

    /// Unlocks an item for the user's rank. Unlocking does not charge gold;
    /// `purchase_item` does.
    #[instrument(skip(self, cancel))]
    pub async fn unlock_item(&self, item_id: i64, cancel: &CancellationToken) -> Result<Ack, ApiError> {
        let ack: Option<Ack> = self
            .post_empty(&format!("{SHOP_PATH}{item_id}/unlock/"), cancel)
            .await?;
        info!("Item unlocked");
        Ok(ack.unwrap_or_default())
    }

    #[instrument(skip(self, cancel))]
    pub async fn purchase_item(&self, item_id: i64, cancel: &CancellationToken) -> Result<Ack, ApiError> {
        let ack: Option<Ack> = self
            .post_empty(&format!("{SHOP_PATH}{item_id}/purchase/"), cancel)
            .await?;
        info!("Item purchased");
        Ok(ack.unwrap_or_default())
    }
}
