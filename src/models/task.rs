use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    VeryEasy = 1,
    Easy = 2,
    #[default]
    Medium = 3,
    Hard = 4,
    VeryHard = 5,
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::VeryEasy),
            2 => Ok(Self::Easy),
            3 => Ok(Self::Medium),
            4 => Ok(Self::Hard),
            5 => Ok(Self::VeryHard),
            other => Err(format!("difficulty must be 1-5, got {other}")),
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        value as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TaskType {
    Daily = 1,
    Weekly = 2,
    #[default]
    Permanent = 3,
}

impl TryFrom<u8> for TaskType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Daily),
            2 => Ok(Self::Weekly),
            3 => Ok(Self::Permanent),
            other => Err(format!("task type must be 1-3, got {other}")),
        }
    }
}

impl From<TaskType> for u8 {
    fn from(value: TaskType) -> Self {
        value as u8
    }
}

/// How a shared task is completed: by any participant, or only once every
/// participant has completed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CollaborationType {
    #[default]
    AnyoneCompletes = 1,
    EveryoneCompletes = 2,
}

impl TryFrom<u8> for CollaborationType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::AnyoneCompletes),
            2 => Ok(Self::EveryoneCompletes),
            other => Err(format!("collaboration type must be 1-2, got {other}")),
        }
    }
}

impl From<CollaborationType> for u8 {
    fn from(value: CollaborationType) -> Self {
        value as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub user: Option<i64>, // owner
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub collaboration_type: CollaborationType,
    #[serde(default)]
    pub reward_xp: u32,
    #[serde(default)]
    pub reward_gold: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields a client may write when creating or editing a task. Rewards are
/// computed by the server and never sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDraft {
    #[serde(skip)]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub collaboration_type: CollaborationType,
    pub is_completed: bool,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            difficulty: Difficulty::default(),
            task_type: TaskType::default(),
            collaboration_type: CollaborationType::default(),
            is_completed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_collaboration(mut self, collaboration_type: CollaborationType) -> Self {
        self.collaboration_type = collaboration_type;
        self
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            id: Some(task.id),
            title: task.title.clone(),
            description: task.description.clone(),
            difficulty: task.difficulty,
            task_type: task.task_type,
            collaboration_type: task.collaboration_type,
            is_completed: task.is_completed,
        }
    }
}

/// Body of the complete, uncomplete and delete actions. When the server
/// echoes the updated user, its xp and gold are authoritative.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskActionResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}
