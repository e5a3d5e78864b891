//! # pleme-tasks
//!
//! Owner-scoped task core for Pleme platform services.
//!
//! ## Features
//!
//! - **Identity** - JWT bearer credentials resolved into a request [`Principal`]
//! - **Ownership Guard** - authentication and ownership checks
//! - **Cursor Pagination** - newest-first pages with stable cursors
//! - **Task Service** - create/update/toggle/delete/get/list over a [`TaskStore`]
//! - **Accounts** - registration and login with argon2 password hashes
//! - **GraphQL** - async-graphql schema and an axum handler injecting the principal
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pleme_tasks::{Config, MemoryTaskStore, NewTask, PageRequest, TaskService};
//!
//! # async fn example(principal: pleme_tasks::Principal) -> pleme_tasks::Result<()> {
//! let config = Config::from_env()?;
//! let tasks = TaskService::new(Arc::new(MemoryTaskStore::new()), config.pagination.clone());
//!
//! tasks.create(Some(&principal), NewTask::new("Write the report")).await?;
//! let page = tasks.list(Some(&principal), PageRequest::first(10)).await?;
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod auth;
pub mod config;
pub mod guard;
pub mod identity;
pub mod operation;
pub mod pagination;
pub mod schema;
pub mod service;
pub mod store;
pub mod task;
pub mod types;

pub use accounts::{AccountService, AuthPayload, Credentials, User};
pub use auth::{extract_bearer, get_principal, graphql_handler};
pub use config::{AuthConfig, Config, PaginationConfig};
pub use guard::{require_authenticated, require_owner, Owned};
pub use identity::{CredentialVerifier, IdentityResolver, JwtCredentials, Principal, VerifiedCredential};
pub use operation::{TaskOperation, TaskOutcome};
pub use pagination::{paginate, CursorCodec, Cursored, Page, PageInfo, PageRequest, PaginationInput};
pub use schema::{build_schema, TaskSchema};
pub use service::TaskService;
pub use store::{MemoryTaskStore, MemoryUserStore, TaskStore, UserStore};
pub use task::{NewTask, Task, TaskId, TaskPatch, UserId};
pub use types::Timestamp;

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Service errors
///
/// Every failure is surfaced as its own kind so the presentation layer can
/// map it to a message and status code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Not the owner of this {0}")]
    OwnershipViolation(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "UNAUTHENTICATED",
            Self::OwnershipViolation(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ValidationFailed(_) => "BAD_USER_INPUT",
            Self::InvalidCursor(_) => "INVALID_CURSOR",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Configuration(_) => "INTERNAL",
        }
    }

    /// Whether a caller may reasonably retry. Nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl ErrorExtensions for ServiceError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| ext.set("code", self.code()))
    }
}

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_errors_are_retryable() {
        assert!(ServiceError::StorageUnavailable("down".into()).is_retryable());
        assert!(!ServiceError::NotFound("task").is_retryable());
        assert!(!ServiceError::AuthenticationRequired.is_retryable());
    }

    #[test]
    fn test_graphql_extension_carries_code() {
        let err = ServiceError::OwnershipViolation("task").extend();
        assert_eq!(err.message, "Not the owner of this task");
        let code = err.extensions.as_ref().and_then(|ext| ext.get("code")).cloned();
        assert_eq!(code, Some(async_graphql::Value::from("FORBIDDEN")));
    }
}
