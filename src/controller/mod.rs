//! The task collection controller.
//!
//! Owns the authoritative task set for the signed-in user, runs every
//! mutation through the gateway, and reloads the whole set after each
//! successful write. View controls live here too so that paging can be
//! kept consistent with the set they page over.

mod control;

pub use control::Control;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::gateway::{BoardError, TaskGateway};
use crate::model::config::PagingConfig;
use crate::model::task::{Identity, Task, TaskPatch, normalize_title};
use crate::model::view::{SortOrder, StatusFilter, ViewControls};
use crate::ops::view::{self, TaskStats, TaskView};

/// Lifecycle of the authoritative set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    /// No identity, no set
    Unauthenticated,
    /// A fetch or write is in flight; the previous set is still shown
    Loading,
    Ready,
    /// The last load failed; a previous good set, if any, is retained
    Errored,
}

/// A `list` call that has been started but not yet applied.
///
/// Tagged with the owner it was issued for, so a response that arrives
/// after the identity changed can be recognised and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    owner_id: String,
}

impl PendingLoad {
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub async fn run<G: TaskGateway + ?Sized>(self, gateway: &G) -> LoadOutcome {
        let result = gateway.list(&self.owner_id).await;
        LoadOutcome {
            owner_id: self.owner_id,
            result,
        }
    }
}

/// The resolved result of a [`PendingLoad`]
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    owner_id: String,
    result: Result<Vec<Task>, BoardError>,
}

/// A validated store write that has been started but not yet applied.
///
/// Like [`PendingLoad`] it carries the owner it was issued for, so the
/// result can be dropped if the identity changes while the store is busy.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    owner_id: String,
    /// Status to restore if the write fails
    previous: CollectionStatus,
    op: WriteOp,
}

#[derive(Debug, Clone)]
enum WriteOp {
    Create { title: String },
    Update { id: String, patch: TaskPatch },
    Delete { id: String },
}

impl PendingWrite {
    /// Send the write and, if it landed, reload the owner's set.
    pub async fn run<G: TaskGateway + ?Sized>(self, gateway: &G) -> WriteOutcome {
        let written = match &self.op {
            WriteOp::Create { title } => gateway.create(title, &self.owner_id).await.map(Some),
            WriteOp::Update { id, patch } => gateway.update(id, patch).await.map(Some),
            WriteOp::Delete { id } => gateway.delete(id).await.map(|()| None),
        };
        let (task, result) = match written {
            Ok(task) => (task, gateway.list(&self.owner_id).await),
            Err(err) => (None, Err(err)),
        };
        WriteOutcome {
            owner_id: self.owner_id,
            previous: self.previous,
            task,
            result,
        }
    }
}

/// The resolved result of a [`PendingWrite`]
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    owner_id: String,
    previous: CollectionStatus,
    task: Option<Task>,
    /// The reloaded set, or the error from the write or the reload
    result: Result<Vec<Task>, BoardError>,
}

impl WriteOutcome {
    /// The record the store returned; `None` for deletes and failed writes
    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }
}

/// What happened to an outcome handed to [`TaskController::apply_load`]
/// or [`TaskController::apply_write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadApplied {
    /// The set was replaced
    Applied,
    /// The outcome was for an owner that is no longer signed in
    Discarded,
}

pub struct TaskController<G: ?Sized> {
    gateway: Arc<G>,
    paging: PagingConfig,
    identity: Option<Identity>,
    status: CollectionStatus,
    tasks: Vec<Task>,
    controls: ViewControls,
    /// Persistent message from a failed load
    banner: Option<String>,
    /// Transient message from a failed mutation
    notice: Option<String>,
}

impl<G: TaskGateway + ?Sized> TaskController<G> {
    pub fn new(gateway: Arc<G>, paging: PagingConfig) -> Self {
        TaskController {
            gateway,
            paging: paging.normalized(),
            identity: None,
            status: CollectionStatus::Unauthenticated,
            tasks: Vec::new(),
            controls: ViewControls::default(),
            banner: None,
            notice: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn gateway(&self) -> Arc<G> {
        Arc::clone(&self.gateway)
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn status(&self) -> CollectionStatus {
        self.status
    }

    /// The authoritative set, in the order the store returned it
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn controls(&self) -> &ViewControls {
        &self.controls
    }

    pub fn paging(&self) -> PagingConfig {
        self.paging
    }

    /// Error from the last failed load, shown until a load succeeds
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Error from the last failed mutation; cleared once read
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn view(&self) -> TaskView<'_> {
        view::derive(&self.tasks, &self.controls, self.paging)
    }

    pub fn stats(&self) -> TaskStats {
        view::stats(&self.tasks)
    }

    pub fn total_pages(&self) -> usize {
        self.view().page.total_pages
    }

    // -----------------------------------------------------------------------
    // Identity and loading
    // -----------------------------------------------------------------------

    /// Apply an identity change from the session.
    ///
    /// A new user discards everything held for the previous one and starts
    /// a load; `None` signs out. Re-publishing the current user is a no-op.
    pub fn set_identity(&mut self, identity: Option<Identity>) -> Option<PendingLoad> {
        match identity {
            None => {
                self.sign_out();
                None
            }
            Some(next) => {
                if self.identity.as_ref().is_some_and(|cur| cur.id == next.id) {
                    self.identity = Some(next);
                    return None;
                }
                self.reset();
                debug!(user = %next.email, "identity changed");
                self.identity = Some(next);
                self.begin_load()
            }
        }
    }

    /// Drop the set, the controls and every message.
    pub fn sign_out(&mut self) {
        if self.identity.is_some() {
            debug!("signed out; discarding task set");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.identity = None;
        self.status = CollectionStatus::Unauthenticated;
        self.tasks.clear();
        self.controls = ViewControls::default();
        self.banner = None;
        self.notice = None;
    }

    /// Mark the set as loading and hand out the request to run.
    /// Returns `None` when nobody is signed in.
    pub fn begin_load(&mut self) -> Option<PendingLoad> {
        let owner_id = self.identity.as_ref()?.id.clone();
        self.status = CollectionStatus::Loading;
        Some(PendingLoad { owner_id })
    }

    /// Apply a resolved load.
    ///
    /// Outcomes for an owner other than the current identity are dropped.
    /// A failed load moves the collection to `Errored` and keeps whatever
    /// set was already held.
    pub fn apply_load(&mut self, outcome: LoadOutcome) -> Result<LoadApplied, BoardError> {
        let current = self.identity.as_ref().map(|i| i.id.as_str());
        if current != Some(outcome.owner_id.as_str()) {
            debug!(owner_id = %outcome.owner_id, "discarding stale task list");
            return Ok(LoadApplied::Discarded);
        }
        match outcome.result {
            Ok(tasks) => {
                self.replace_tasks(tasks);
                Ok(LoadApplied::Applied)
            }
            Err(err) => {
                warn!(error = %err, "loading tasks failed");
                self.status = CollectionStatus::Errored;
                self.banner = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Set the identity and, if it changed, load that user's tasks.
    pub async fn activate(&mut self, identity: Option<Identity>) -> Result<(), BoardError> {
        match self.set_identity(identity) {
            Some(pending) => {
                let outcome = pending.run(self.gateway.as_ref()).await;
                self.apply_load(outcome).map(|_| ())
            }
            None => Ok(()),
        }
    }

    /// Reload the set for the current identity.
    pub async fn reload(&mut self) -> Result<(), BoardError> {
        let pending = self.begin_load().ok_or_else(BoardError::not_authenticated)?;
        let outcome = pending.run(self.gateway.as_ref()).await;
        self.apply_load(outcome).map(|_| ())
    }

    /// Wait for the next session change and apply it.
    ///
    /// The load started for a new identity races against later session
    /// changes. A sign-out or user switch while the store is still busy
    /// takes effect at once and the superseded load is dropped unapplied.
    /// Returns `false` once the session has gone away.
    pub async fn follow(&mut self, session: &mut watch::Receiver<Option<Identity>>) -> bool {
        if session.changed().await.is_err() {
            return false;
        }
        let mut pending = self.set_identity(session.borrow_and_update().clone());
        let mut session_open = true;

        while let Some(load) = pending.take() {
            let owner_id = load.owner_id().to_string();
            let gateway = Arc::clone(&self.gateway);
            let run = load.run(gateway.as_ref());
            tokio::pin!(run);

            loop {
                tokio::select! {
                    outcome = &mut run => {
                        // A failed load is already recorded in the banner
                        let _ = self.apply_load(outcome);
                        break;
                    }
                    changed = session.changed(), if session_open => {
                        if changed.is_err() {
                            session_open = false;
                            continue;
                        }
                        let identity = session.borrow_and_update().clone();
                        let same_owner = identity.as_ref().is_some_and(|i| i.id == owner_id);
                        pending = self.set_identity(identity);
                        if !same_owner {
                            debug!(owner_id = %owner_id, "dropping in-flight load");
                            break;
                        }
                    }
                }
            }
        }
        true
    }

    fn replace_tasks(&mut self, mut tasks: Vec<Task>) {
        if let Some(owner) = self.identity.as_ref().map(|i| i.id.clone()) {
            let before = tasks.len();
            tasks.retain(|t| t.owner_id == owner);
            if tasks.len() != before {
                warn!(dropped = before - tasks.len(), "store returned tasks for another owner");
            }
        }
        self.tasks = tasks;
        self.status = CollectionStatus::Ready;
        self.banner = None;

        let pages = self.total_pages();
        self.controls.expanded_pages.retain(|&p| p <= pages);
        self.clamp_page();
        debug!(count = self.tasks.len(), "task set replaced");
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    fn require_owner(&self) -> Result<String, BoardError> {
        self.identity
            .as_ref()
            .map(|i| i.id.clone())
            .ok_or_else(BoardError::not_authenticated)
    }

    /// Validate a new task and mark the collection busy.
    pub fn begin_add(&mut self, title: &str) -> Result<PendingWrite, BoardError> {
        let owner_id = self.require_owner()?;
        let title = normalize_title(title).ok_or_else(BoardError::empty_title)?;
        Ok(self.begin_write(owner_id, WriteOp::Create { title }))
    }

    pub fn begin_toggle(&mut self, id: &str, is_complete: bool) -> Result<PendingWrite, BoardError> {
        let owner_id = self.require_owner()?;
        let patch = TaskPatch::complete(is_complete);
        Ok(self.begin_write(owner_id, WriteOp::Update { id: id.to_string(), patch }))
    }

    pub fn begin_edit(&mut self, id: &str, title: &str) -> Result<PendingWrite, BoardError> {
        let owner_id = self.require_owner()?;
        let title = normalize_title(title).ok_or_else(BoardError::empty_title)?;
        let patch = TaskPatch::title(title);
        Ok(self.begin_write(owner_id, WriteOp::Update { id: id.to_string(), patch }))
    }

    pub fn begin_delete(&mut self, id: &str) -> Result<PendingWrite, BoardError> {
        let owner_id = self.require_owner()?;
        Ok(self.begin_write(owner_id, WriteOp::Delete { id: id.to_string() }))
    }

    fn begin_write(&mut self, owner_id: String, op: WriteOp) -> PendingWrite {
        self.notice = None;
        let previous = std::mem::replace(&mut self.status, CollectionStatus::Loading);
        PendingWrite {
            owner_id,
            previous,
            op,
        }
    }

    /// Apply a resolved write.
    ///
    /// On success the set is replaced by the reloaded list; it is never
    /// patched in place. On failure the previous status comes back and the
    /// error becomes the transient notice. Outcomes for an owner that is no
    /// longer signed in are dropped.
    pub fn apply_write(&mut self, outcome: WriteOutcome) -> Result<LoadApplied, BoardError> {
        let current = self.identity.as_ref().map(|i| i.id.as_str());
        if current != Some(outcome.owner_id.as_str()) {
            debug!(owner_id = %outcome.owner_id, "discarding stale write result");
            return Ok(LoadApplied::Discarded);
        }
        match outcome.result {
            Ok(tasks) => {
                self.replace_tasks(tasks);
                Ok(LoadApplied::Applied)
            }
            Err(err) => {
                warn!(error = %err, "task mutation failed");
                self.status = outcome.previous;
                self.notice = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn finish_write(&mut self, pending: PendingWrite) -> Result<Option<Task>, BoardError> {
        let outcome = pending.run(self.gateway.as_ref()).await;
        let task = outcome.task().cloned();
        self.apply_write(outcome)?;
        Ok(task)
    }

    /// Create a task, then reload.
    pub async fn add_task(&mut self, title: &str) -> Result<Task, BoardError> {
        let pending = self.begin_add(title)?;
        self.finish_write(pending).await?.ok_or_else(no_row)
    }

    /// Set the completion flag, then reload.
    pub async fn toggle_task(&mut self, id: &str, is_complete: bool) -> Result<Task, BoardError> {
        let pending = self.begin_toggle(id, is_complete)?;
        self.finish_write(pending).await?.ok_or_else(no_row)
    }

    /// Change a task's title, then reload.
    pub async fn edit_task(&mut self, id: &str, title: &str) -> Result<Task, BoardError> {
        let pending = self.begin_edit(id, title)?;
        self.finish_write(pending).await?.ok_or_else(no_row)
    }

    /// Delete a task, then reload.
    pub async fn delete_task(&mut self, id: &str) -> Result<(), BoardError> {
        let pending = self.begin_delete(id)?;
        self.finish_write(pending).await.map(|_| ())
    }

    // -----------------------------------------------------------------------
    // View controls
    // -----------------------------------------------------------------------

    pub fn set_search_query(&mut self, query: &str) {
        if self.controls.search_query != query {
            self.controls.search_query = query.to_string();
            self.filters_changed();
        }
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        if self.controls.status_filter != status {
            self.controls.status_filter = status;
            self.filters_changed();
        }
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        if self.controls.sort_order != order {
            self.controls.sort_order = order;
            self.filters_changed();
        }
    }

    /// Expansion belongs to a particular filtered view, so any change to
    /// search, status or sort forgets it.
    fn filters_changed(&mut self) {
        self.controls.expanded_pages.clear();
        self.clamp_page();
    }

    fn clamp_page(&mut self) {
        let pages = self.total_pages();
        self.controls.current_page = self.controls.current_page.clamp(1, pages);
    }

    /// Go to page `page`, clamped to the valid range. A page that was
    /// expanded before comes back expanded.
    pub fn request_page(&mut self, page: usize) {
        let pages = self.total_pages();
        self.controls.current_page = page.clamp(1, pages);
    }

    pub fn previous_page(&mut self) {
        let page = self.controls.current_page.saturating_sub(1);
        self.request_page(page);
    }

    pub fn next_page(&mut self) {
        let page = self.controls.current_page.saturating_add(1);
        self.request_page(page);
    }

    /// Reveal the rest of the current page ("load more")
    pub fn request_expand_page(&mut self) {
        let page = self.controls.current_page;
        self.controls.expanded_pages.insert(page);
    }
}

fn no_row() -> BoardError {
    BoardError::Store("store returned no task".into())
}
