use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::client::ApiClient;
use crate::error::ApiError;
use crate::models::Ack;
use crate::models::friend::{FriendRequest, FriendRequestBody, Friendship, RequestDirection, UserSummary};

pub const FRIENDSHIPS_PATH: &str = "/api/friendships/";
pub const FRIEND_REQUESTS_PATH: &str = "/api/friend-requests/";
pub const USER_SEARCH_PATH: &str = "/api/user-search/";

impl ApiClient {
    pub async fn list_friends(&self, cancel: &CancellationToken) -> Result<Vec<Friendship>, ApiError> {
        self.get(FRIENDSHIPS_PATH, cancel).await
    }

    pub async fn friend_requests(
        &self,
        direction: RequestDirection,
        cancel: &CancellationToken,
    ) -> Result<Vec<FriendRequest>, ApiError> {
        self.get_with_query(FRIEND_REQUESTS_PATH, &[("type", direction.as_query())], cancel)
            .await
    }

    /// Requests waiting for the user's answer.
    pub async fn received_friend_requests(&self, cancel: &CancellationToken) -> Result<Vec<FriendRequest>, ApiError> {
        self.friend_requests(RequestDirection::Received, cancel).await
    }

    /// Users whose username or email contains `query`, the caller excluded.
    pub async fn search_users(&self, query: &str, cancel: &CancellationToken) -> Result<Vec<UserSummary>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.get_with_query(USER_SEARCH_PATH, &[("q", query)], cancel).await
    }

    #[instrument(skip(self, cancel))]
    pub async fn send_friend_request(&self, to_user: i64, cancel: &CancellationToken) -> Result<(), ApiError> {
        let _: Option<serde_json::Value> = self
            .post(FRIEND_REQUESTS_PATH, &FriendRequestBody { to_user }, cancel)
            .await?;
        info!("Friend request sent");
        Ok(())
    }

    #[instrument(skip(self, cancel))]
    pub async fn respond_friend_request(
        &self,
        request_id: i64,
        accept: bool,
        cancel: &CancellationToken,
    ) -> Result<Ack, ApiError> {
        let action = if accept { "accept" } else { "reject" };
        let ack: Option<Ack> = self
            .post_empty(&format!("{FRIEND_REQUESTS_PATH}{request_id}/{action}/"), cancel)
            .await?;
        info!(action, "Friend request answered");
        Ok(ack.unwrap_or_default())
    }

    #[instrument(skip(self, cancel))]
    pub async fn remove_friend(&self, friendship_id: i64, cancel: &CancellationToken) -> Result<(), ApiError> {
        let _: Option<Ack> = self
            .delete(&format!("{FRIENDSHIPS_PATH}{friendship_id}/"), cancel)
            .await?;
        info!("Friend removed");
        Ok(())
    }
}
