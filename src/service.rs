//! Task service
//!
//! Owner-scoped operations over a [`TaskStore`]. Every operation rejects
//! anonymous callers before touching storage. Non-create operations fetch the
//! task, report `NotFound` if it is missing, then check ownership before
//! mutating.
//!
//! The read-check-write sequence is not atomic: two concurrent updates of the
//! same task both pass their checks and the later write wins.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::PaginationConfig;
use crate::guard::{require_authenticated, require_owner};
use crate::identity::Principal;
use crate::pagination::{paginate, Page, PageRequest};
use crate::store::TaskStore;
use crate::task::{NewTask, Task, TaskId, TaskPatch};
use crate::{Result, ServiceError};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    pagination: PaginationConfig,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, pagination: PaginationConfig) -> Self {
        Self { store, pagination }
    }

    pub async fn create(&self, principal: Option<&Principal>, input: NewTask) -> Result<Task> {
        let principal = require_authenticated(principal)?;
        input.validate()?;

        let task = self.store.insert(Task::new(principal.id, input, Utc::now())).await?;
        info!(target: "pleme_tasks::service", task_id = %task.id, owner = %principal.id, "Task created");
        Ok(task)
    }

    pub async fn get(&self, principal: Option<&Principal>, id: TaskId) -> Result<Task> {
        let principal = require_authenticated(principal)?;
        self.fetch_owned(principal, id).await
    }

    pub async fn list(&self, principal: Option<&Principal>, request: PageRequest) -> Result<Page<Task>> {
        let principal = require_authenticated(principal)?;
        let first = self.page_size(request.first)?;

        let tasks = self.store.find_all_for_owner(principal.id).await?;
        let total_count = self.store.count(principal.id).await?;
        let page = paginate(tasks, first, request.after.as_ref())?.with_total_count(total_count);

        debug!(
            target: "pleme_tasks::service",
            owner = %principal.id,
            first,
            returned = page.items.len(),
            has_next_page = page.has_next_page,
            "Tasks listed"
        );
        Ok(page)
    }

    pub async fn update(&self, principal: Option<&Principal>, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let principal = require_authenticated(principal)?;
        patch.validate()?;

        let task = self.fetch_owned(principal, id).await?;
        let updated = self.store.update_fields(task.id, patch).await?;
        info!(target: "pleme_tasks::service", task_id = %id, "Task updated");
        Ok(updated)
    }

    /// Flip the completion flag
    pub async fn toggle(&self, principal: Option<&Principal>, id: TaskId) -> Result<Task> {
        let principal = require_authenticated(principal)?;

        let task = self.fetch_owned(principal, id).await?;
        let updated = self
            .store
            .update_fields(task.id, TaskPatch::completed(!task.completed))
            .await?;
        info!(target: "pleme_tasks::service", task_id = %id, completed = updated.completed, "Task toggled");
        Ok(updated)
    }

    /// Delete and return the removed task
    pub async fn delete(&self, principal: Option<&Principal>, id: TaskId) -> Result<Task> {
        let principal = require_authenticated(principal)?;

        let task = self.fetch_owned(principal, id).await?;
        let deleted = self.store.delete_by_id(task.id).await?;
        info!(target: "pleme_tasks::service", task_id = %id, "Task deleted");
        Ok(deleted)
    }

    async fn fetch_owned(&self, principal: &Principal, id: TaskId) -> Result<Task> {
        let task = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("task"))?;
        require_owner(principal, &task)?;
        Ok(task)
    }

    fn page_size(&self, first: Option<usize>) -> Result<usize> {
        let first = first.unwrap_or(self.pagination.default_page_size);
        match self.pagination.max_page_size {
            Some(max) if first > max => Err(ServiceError::ValidationFailed(format!(
                "'first' cannot exceed {}",
                max
            ))),
            _ => Ok(first),
        }
    }
}
