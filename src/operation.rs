//! Closed set of task operations
//!
//! Request layers that do not go through GraphQL (queues, RPC, tests) can
//! build a [`TaskOperation`] and hand it to [`TaskService::execute`].

use crate::identity::Principal;
use crate::pagination::{Page, PageRequest};
use crate::service::TaskService;
use crate::task::{NewTask, Task, TaskId, TaskPatch};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOperation {
    Create(NewTask),
    Get(TaskId),
    List(PageRequest),
    Update { id: TaskId, patch: TaskPatch },
    Toggle(TaskId),
    Delete(TaskId),
}

impl TaskOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Get(_) => "get",
            Self::List(_) => "list",
            Self::Update { .. } => "update",
            Self::Toggle(_) => "toggle",
            Self::Delete(_) => "delete",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Get(_) | Self::List(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Task(Task),
    Page(Page<Task>),
}

impl TaskOutcome {
    pub fn into_task(self) -> Option<Task> {
        match self {
            Self::Task(task) => Some(task),
            Self::Page(_) => None,
        }
    }

    pub fn into_page(self) -> Option<Page<Task>> {
        match self {
            Self::Page(page) => Some(page),
            Self::Task(_) => None,
        }
    }
}

impl TaskService {
    /// Dispatch one operation on behalf of `principal`
    pub async fn execute(&self, principal: Option<&Principal>, operation: TaskOperation) -> Result<TaskOutcome> {
        tracing::debug!(target: "pleme_tasks::operation", op = operation.name(), "Executing");

        match operation {
            TaskOperation::Create(input) => self.create(principal, input).await.map(TaskOutcome::Task),
            TaskOperation::Get(id) => self.get(principal, id).await.map(TaskOutcome::Task),
            TaskOperation::List(request) => self.list(principal, request).await.map(TaskOutcome::Page),
            TaskOperation::Update { id, patch } => {
                self.update(principal, id, patch).await.map(TaskOutcome::Task)
            }
            TaskOperation::Toggle(id) => self.toggle(principal, id).await.map(TaskOutcome::Task),
            TaskOperation::Delete(id) => self.delete(principal, id).await.map(TaskOutcome::Task),
        }
    }
}
