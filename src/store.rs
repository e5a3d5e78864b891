//! Storage collaborators
//!
//! The service owns no persistent state. Everything goes through these
//! traits; implementations may suspend on I/O and report transient failures
//! as `StorageUnavailable`, which callers propagate unchanged.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::accounts::User;
use crate::pagination::newest_first;
use crate::task::{Task, TaskId, TaskPatch, UserId};
use crate::{Result, ServiceError};

/// Persistence for tasks
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>>;

    /// All tasks of `owner` in canonical newest-first order
    async fn find_all_for_owner(&self, owner: UserId) -> Result<Vec<Task>>;

    async fn count(&self, owner: UserId) -> Result<usize>;

    async fn insert(&self, task: Task) -> Result<Task>;

    /// Apply `patch` and stamp `updated_at`. Fails `NotFound` if the task is gone.
    async fn update_fields(&self, id: TaskId, patch: TaskPatch) -> Result<Task>;

    /// Remove and return the task. Fails `NotFound` if the task is gone.
    async fn delete_by_id(&self, id: TaskId) -> Result<Task>;
}

/// Persistence for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Lookup by normalized (trimmed, lowercase) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fails `ValidationFailed` when the email is already taken
    async fn insert(&self, user: User) -> Result<User>;
}

/// In-memory task store
///
/// Each call holds the lock for its whole duration, so single calls are
/// atomic; sequences of calls are not.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn find_all_for_owner(&self, owner: UserId) -> Result<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut owned: Vec<Task> = tasks
            .values()
            .filter(|task| task.owner_id == owner)
            .cloned()
            .collect();
        owned.sort_by(newest_first);
        Ok(owned)
    }

    async fn count(&self, owner: UserId) -> Result<usize> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().filter(|task| task.owner_id == owner).count())
    }

    async fn insert(&self, task: Task) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(ServiceError::ValidationFailed(format!(
                "task {} already exists",
                task.id
            )));
        }
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_fields(&self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(ServiceError::NotFound("task"))?;
        task.apply(&patch, Utc::now());
        Ok(task.clone())
    }

    async fn delete_by_id(&self, id: TaskId) -> Result<Task> {
        self.tasks
            .write()
            .await
            .remove(&id)
            .ok_or(ServiceError::NotFound("task"))
    }
}

/// In-memory user store keyed by id with an email index
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<UserTables>,
}

#[derive(Default)]
struct UserTables {
    by_id: HashMap<UserId, User>,
    by_email: HashMap<String, UserId>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables
            .by_email
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn insert(&self, user: User) -> Result<User> {
        let mut tables = self.inner.write().await;
        if tables.by_email.contains_key(&user.email) {
            return Err(ServiceError::ValidationFailed(
                "email is already registered".to_string(),
            ));
        }
        tables.by_email.insert(user.email.clone(), user.id);
        tables.by_id.insert(user.id, user.clone());
        Ok(user)
    }
}
