use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use super::{BoardError, TaskGateway};
use crate::model::task::{Task, TaskPatch, normalize_title};

/// Operations a queued failure can be aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    List,
    Create,
    Update,
    Delete,
}

/// An in-process task store with the same contract as the hosted one.
///
/// Clones share the same underlying records, so a test can hold one handle
/// while the controller owns another. Failures can be queued with
/// [`MemoryStore::fail_next`] or [`MemoryStore::fail_next_op`] to exercise
/// error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: Vec<Task>,
    last_created: Option<DateTime<Utc>>,
    failures: VecDeque<(Option<StoreOp>, String)>,
    list_calls: usize,
}

impl Inner {
    /// Creation timestamps are strictly increasing so ordering is
    /// deterministic even when the wall clock does not move.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_created = Some(ts);
        ts
    }

    /// Pop the first queued failure aimed at `op` or at any operation
    fn take_failure(&mut self, op: StoreOp) -> Result<(), BoardError> {
        let pos = self
            .failures
            .iter()
            .position(|(target, _)| target.is_none_or(|t| t == op));
        match pos.and_then(|i| self.failures.remove(i)) {
            Some((_, message)) => Err(BoardError::Store(message)),
            None => Ok(()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing records, e.g. fixtures with fixed timestamps
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let last_created = tasks.iter().map(|t| t.created_at).max();
        MemoryStore {
            inner: Arc::new(Mutex::new(Inner {
                tasks,
                last_created,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next operation (of any kind) fail with a store error
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().failures.push_back((None, message.into()));
    }

    /// Make the next operation of kind `op` fail with a store error
    pub fn fail_next_op(&self, op: StoreOp, message: impl Into<String>) {
        self.lock().failures.push_back((Some(op), message.into()));
    }

    /// Snapshot of every record, across all owners
    pub fn all_tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    /// How many times `list` has been called
    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }
}

#[async_trait]
impl TaskGateway for MemoryStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Task>, BoardError> {
        let mut inner = self.lock();
        inner.list_calls += 1;
        inner.take_failure(StoreOp::List)?;
        if owner_id.is_empty() {
            debug!("list called without an owner id");
            return Ok(Vec::new());
        }
        let mut tasks: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(owner_id, count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    async fn create(&self, title: &str, owner_id: &str) -> Result<Task, BoardError> {
        if owner_id.is_empty() {
            return Err(BoardError::not_authenticated());
        }
        let title = normalize_title(title).ok_or_else(BoardError::empty_title)?;
        let mut inner = self.lock();
        inner.take_failure(StoreOp::Create)?;
        let task = Task {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title,
            is_complete: false,
            created_at: inner.next_timestamp(),
        };
        inner.tasks.push(task.clone());
        debug!(id = %task.id, owner_id, "created task");
        Ok(task)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, BoardError> {
        if patch.is_empty() {
            return Err(BoardError::empty_patch());
        }
        let mut patch = patch.clone();
        if let Some(title) = patch.title.take() {
            patch.title = Some(normalize_title(&title).ok_or_else(BoardError::empty_title)?);
        }
        let mut inner = self.lock();
        inner.take_failure(StoreOp::Update)?;
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BoardError::not_found(id))?;
        patch.apply_to(task);
        debug!(id, "updated task");
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), BoardError> {
        let mut inner = self.lock();
        inner.take_failure(StoreOp::Delete)?;
        let pos = inner
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| BoardError::not_found(id))?;
        inner.tasks.remove(pos);
        debug!(id, "deleted task");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_assigns_id_and_defaults() {
        let store = MemoryStore::new();
        let task = store.create("  Buy milk ", "u1").await.unwrap();
        assert!(!task.id.is_empty());
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.owner_id, "u1");
        assert!(!task.is_complete);
    }

    #[tokio::test]
    async fn test_create_requires_owner() {
        let store = MemoryStore::new();
        let err = store.create("Buy milk", "").await.unwrap_err();
        assert_eq!(err, BoardError::not_authenticated());
        assert!(store.all_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let store = MemoryStore::new();
        let err = store.create("   ", "u1").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_list_is_per_owner_newest_first() {
        let store = MemoryStore::new();
        store.create("first", "u1").await.unwrap();
        store.create("other", "u2").await.unwrap();
        store.create("second", "u1").await.unwrap();

        let titles: Vec<String> = store
            .list("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_list_without_owner_is_empty() {
        let store = MemoryStore::new();
        store.create("first", "u1").await.unwrap();
        assert!(store.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let store = MemoryStore::new();
        let a = store.create("a", "u1").await.unwrap();
        let b = store.create("b", "u1").await.unwrap();
        assert!(b.created_at > a.created_at);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = MemoryStore::new();
        let task = store.create("draft", "u1").await.unwrap();
        let updated = store
            .update(&task.id, &TaskPatch::complete(true))
            .await
            .unwrap();
        assert!(updated.is_complete);
        assert_eq!(updated.title, "draft");
        assert_eq!(updated.created_at, task.created_at);

        let renamed = store.update(&task.id, &TaskPatch::title(" final ")).await.unwrap();
        assert_eq!(renamed.title, "final");
        assert!(renamed.is_complete);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = MemoryStore::new();
        let err = store.update("nope", &TaskPatch::complete(true)).await.unwrap_err();
        assert_eq!(err, BoardError::not_found("nope"));
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let store = MemoryStore::new();
        let task = store.create("draft", "u1").await.unwrap();
        let err = store.update(&task.id, &TaskPatch::default()).await.unwrap_err();
        assert_eq!(err, BoardError::empty_patch());
        assert_eq!(store.all_tasks()[0], task);
    }

    #[tokio::test]
    async fn test_delete_twice_is_store_error() {
        let store = MemoryStore::new();
        let task = store.create("temp", "u1").await.unwrap();
        store.delete(&task.id).await.unwrap();
        let err = store.delete(&task.id).await.unwrap_err();
        assert!(err.is_store());
    }

    #[tokio::test]
    async fn test_fail_next_op_skips_other_ops() {
        let store = MemoryStore::new();
        store.fail_next_op(StoreOp::List, "list down");
        let task = store.create("still works", "u1").await.unwrap();
        store.update(&task.id, &TaskPatch::complete(true)).await.unwrap();
        assert!(store.list("u1").await.is_err());
        assert_eq!(store.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let store = MemoryStore::new();
        store.fail_next("connection reset");
        let err = store.list("u1").await.unwrap_err();
        assert_eq!(err, BoardError::Store("connection reset".into()));
        assert!(store.list("u1").await.is_ok());
        assert_eq!(store.list_calls(), 2);
    }
}
