use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::client::ApiClient;
use crate::error::ApiError;
use crate::models::Ack;
use crate::models::task::{Task, TaskActionResponse, TaskDraft};

pub const TASKS_PATH: &str = "/api/tasks/";

fn task_path(id: i64, action: &str) -> String {
    if action.is_empty() {
        format!("{TASKS_PATH}{id}/")
    } else {
        format!("{TASKS_PATH}{id}/{action}/")
    }
}

impl ApiClient {
    /// Tasks visible to the user: owned ones and ones shared with them.
    pub async fn list_tasks(&self, cancel: &CancellationToken) -> Result<Vec<Task>, ApiError> {
        self.get(TASKS_PATH, cancel).await
    }

    #[instrument(skip(self, draft, cancel), fields(title = %draft.title))]
    pub async fn create_task(&self, draft: &TaskDraft, cancel: &CancellationToken) -> Result<Task, ApiError> {
        let task: Task = self.post(TASKS_PATH, draft, cancel).await?;
        info!(task_id = task.id, "Task created");
        Ok(task)
    }

    #[instrument(skip(self, draft, cancel))]
    pub async fn update_task(
        &self,
        id: i64,
        draft: &TaskDraft,
        cancel: &CancellationToken,
    ) -> Result<Task, ApiError> {
        self.patch(&task_path(id, ""), draft, cancel).await
    }

    pub async fn complete_task(&self, id: i64, cancel: &CancellationToken) -> Result<TaskActionResponse, ApiError> {
        let response: Option<TaskActionResponse> = self.post_empty(&task_path(id, "complete"), cancel).await?;
        Ok(response.unwrap_or_default())
    }

    pub async fn uncomplete_task(&self, id: i64, cancel: &CancellationToken) -> Result<TaskActionResponse, ApiError> {
        let response: Option<TaskActionResponse> = self.post_empty(&task_path(id, "uncomplete"), cancel).await?;
        Ok(response.unwrap_or_default())
    }

    /// Deletes an owned task. A finished task comes back as 204 with no
    /// body; an unfinished one echoes the penalised user.
    pub async fn delete_task(&self, id: i64, cancel: &CancellationToken) -> Result<TaskActionResponse, ApiError> {
        let response: Option<TaskActionResponse> = self.post_empty(&task_path(id, "delete"), cancel).await?;
        Ok(response.unwrap_or_default())
    }

    pub async fn remove_collaborator(
        &self,
        task_id: i64,
        user_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Ack, ApiError> {
        let path = format!("{TASKS_PATH}{task_id}/remove-collaborator/{user_id}/");
        let ack: Option<Ack> = self.delete(&path, cancel).await?;
        Ok(ack.unwrap_or_default())
    }
}
