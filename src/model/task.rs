use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single to-do item as stored by the remote task store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier, never changes after creation
    pub id: String,
    /// Owning user. The wire format calls this `user_id`.
    #[serde(rename = "user_id")]
    pub owner_id: String,
    /// Task title, never empty after trimming
    pub title: String,
    /// Completion flag
    #[serde(default)]
    pub is_complete: bool,
    /// Store-assigned creation time; the default ordering key
    pub created_at: DateTime<Utc>,
}

/// Fields sent to the store when creating a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(rename = "user_id")]
    pub owner_id: String,
}

/// Partial update. Only the title and completion flag are writable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
}

impl TaskPatch {
    pub fn complete(is_complete: bool) -> Self {
        TaskPatch {
            is_complete: Some(is_complete),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        TaskPatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.is_complete.is_none()
    }

    /// Merge this patch into an existing record
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(done) = self.is_complete {
            task.is_complete = done;
        }
    }
}

/// The signed-in user, as reported by the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Identity {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// Trim a title and reject it if nothing is left
pub fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
