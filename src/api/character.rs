use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::client::ApiClient;
use crate::error::ApiError;
use crate::models::Ack;
use crate::models::shop::{ChangeItemRequest, Rank};
use crate::models::user::{ChangeItemResponse, Character, PasswordChange, ProfileUpdate, UserProfile};

pub const CHARACTER_PATH: &str = "/api/character/get-character/";
pub const CHANGE_ITEM_PATH: &str = "/api/character/change-item/";
pub const RANKS_PATH: &str = "/api/ranks/";
pub const ME_PATH: &str = "/api/user/me/";
pub const UPDATE_PROFILE_PATH: &str = "/api/user/update-profile/";
pub const CHANGE_PASSWORD_PATH: &str = "/api/user/change-password/";

impl ApiClient {
    pub async fn get_character(&self, cancel: &CancellationToken) -> Result<Character, ApiError> {
        self.get(CHARACTER_PATH, cancel).await
    }

    /// Equips an owned inventory item, replacing whatever held its slot.
    /// Returns the updated character.
    #[instrument(skip(self, cancel))]
    pub async fn change_item(&self, inventory_item_id: i64, cancel: &CancellationToken) -> Result<Character, ApiError> {
        let response: ChangeItemResponse = self
            .post(CHANGE_ITEM_PATH, &ChangeItemRequest { inventory_item_id }, cancel)
            .await?;
        response
            .character
            .ok_or_else(|| ApiError::UnexpectedResponse("change-item response has no character".into()))
    }

    pub async fn list_ranks(&self, cancel: &CancellationToken) -> Result<Vec<Rank>, ApiError> {
        self.get(RANKS_PATH, cancel).await
    }

    pub async fn me(&self, cancel: &CancellationToken) -> Result<UserProfile, ApiError> {
        self.get(ME_PATH, cancel).await
    }

    #[instrument(skip(self, update, cancel))]
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        cancel: &CancellationToken,
    ) -> Result<Ack, ApiError> {
        let ack: Option<Ack> = self.patch(UPDATE_PROFILE_PATH, update, cancel).await?;
        info!("Profile updated");
        Ok(ack.unwrap_or_default())
    }

    /// Validates the form locally (`confirmation` must match the new
    /// password) before anything is sent.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        change: &PasswordChange,
        confirmation: &str,
        cancel: &CancellationToken,
    ) -> Result<Ack, ApiError> {
        change.validate(confirmation).map_err(ApiError::Validation)?;
        let ack: Option<Ack> = self.post(CHANGE_PASSWORD_PATH, change, cancel).await?;
        info!("Password changed");
        Ok(ack.unwrap_or_default())
    }
}
