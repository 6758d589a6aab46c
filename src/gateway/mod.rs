pub mod memory;
pub mod rest;

pub use memory::{MemoryStore, StoreOp};
pub use rest::RestStore;

use async_trait::async_trait;

use crate::model::task::{Task, TaskPatch};

/// Error type shared by the gateway and the controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// A caller-side precondition was violated. Never retried.
    #[error("{0}")]
    Validation(String),
    /// The remote operation failed (network, auth, not found).
    #[error("{0}")]
    Store(String),
}

impl BoardError {
    pub fn not_authenticated() -> Self {
        BoardError::Validation("user not authenticated".into())
    }

    pub fn empty_title() -> Self {
        BoardError::Validation("task title cannot be empty".into())
    }

    pub fn empty_patch() -> Self {
        BoardError::Validation("nothing to update".into())
    }

    pub fn not_found(id: &str) -> Self {
        BoardError::Store(format!("task not found: {}", id))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BoardError::Validation(_))
    }

    pub fn is_store(&self) -> bool {
        matches!(self, BoardError::Store(_))
    }
}

/// The four operations the controller needs from the remote task store.
///
/// Implementations never retry. An empty `owner_id` counts as missing.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// All tasks owned by `owner_id`. A missing owner yields an empty list
    /// rather than an error.
    async fn list(&self, owner_id: &str) -> Result<Vec<Task>, BoardError>;

    /// Create a task and return it with its assigned id and timestamp.
    async fn create(&self, title: &str, owner_id: &str) -> Result<Task, BoardError>;

    /// Merge `patch` into the task with this id and return the result.
    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, BoardError>;

    async fn delete(&self, id: &str) -> Result<(), BoardError>;
}
