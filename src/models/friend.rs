use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::shop::Rank;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Friendship {
    pub id: i64,
    pub friend: UserSummary,
    #[serde(default)]
    pub rank: Option<Rank>,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendRequest {
    pub id: i64,
    pub from_user: UserSummary,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct FriendRequestBody {
    pub to_user: i64,
}

/// Which side of the friend-request list to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
    Received,
    Sent,
    All,
}

impl RequestDirection {
    pub fn as_query(self) -> &'static str {
        match self {
            RequestDirection::Received => "received",
            RequestDirection::Sent => "sent",
            RequestDirection::All => "all",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationTask {
    pub id: i64,
    #[serde(default)]
    pub title: String,
}

/// A pending request to join someone else's task.
#[derive(Debug, Clone, Deserialize)]
pub struct CollaborationInvitation {
    pub id: i64,
    #[serde(default)]
    pub task: Option<InvitationTask>,
    #[serde(default)]
    pub invited_by: Option<UserSummary>,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct InvitationRequest<'a> {
    pub task_id: i64,
    pub collaborator_ids: &'a [i64],
}

#[derive(Debug, Serialize)]
pub struct CollaborationCheckRequest<'a> {
    pub task_id: Option<i64>,
    pub collaborators: &'a [i64],
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub accept: bool,
}
