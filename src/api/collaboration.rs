use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::client::ApiClient;
use crate::error::ApiError;
use crate::models::Ack;
use crate::models::friend::{
    CollaborationCheckRequest, CollaborationInvitation, InvitationRequest, InvitationResponse,
};

pub const CHECK_COLLABORATION_PATH: &str = "/api/check-collaboration/check-collaboration/";
pub const INVITATIONS_PATH: &str = "/api/collaboration-invitations/";

impl ApiClient {
    /// Asks the server whether every collaborator is a friend of the user.
    /// A collaborator who is not comes back as a rejection naming them.
    pub async fn check_collaboration(
        &self,
        task_id: Option<i64>,
        collaborators: &[i64],
        cancel: &CancellationToken,
    ) -> Result<Ack, ApiError> {
        let request = CollaborationCheckRequest { task_id, collaborators };
        let ack: Option<Ack> = self.post(CHECK_COLLABORATION_PATH, &request, cancel).await?;
        Ok(ack.unwrap_or_default())
    }

    #[instrument(skip(self, cancel))]
    pub async fn send_invitations(
        &self,
        task_id: i64,
        collaborator_ids: &[i64],
        cancel: &CancellationToken,
    ) -> Result<Ack, ApiError> {
        let request = InvitationRequest { task_id, collaborator_ids };
        let ack: Option<Ack> = self
            .post(&format!("{INVITATIONS_PATH}send-invitation/"), &request, cancel)
            .await?;
        info!(count = collaborator_ids.len(), "Collaboration invitations sent");
        Ok(ack.unwrap_or_default())
    }

    pub async fn pending_invitations(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<CollaborationInvitation>, ApiError> {
        self.get(&format!("{INVITATIONS_PATH}pending-invitations/"), cancel).await
    }

    #[instrument(skip(self, cancel))]
    pub async fn respond_invitation(
        &self,
        invitation_id: i64,
        accept: bool,
        cancel: &CancellationToken,
    ) -> Result<Ack, ApiError> {
        let ack: Option<Ack> = self
            .post(
                &format!("{INVITATIONS_PATH}{invitation_id}/respond-invitation/"),
                &InvitationResponse { accept },
                cancel,
            )
            .await?;
        info!(accept, "Collaboration invitation answered");
        Ok(ack.unwrap_or_default())
    }
}
