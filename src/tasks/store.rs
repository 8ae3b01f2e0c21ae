//! Task store trait and its error type.

use crate::tasks::models::{Task, TaskId, TaskPatch};
use async_trait::async_trait;

/// Any failure of a task store call.
///
/// Callers are not expected to branch on the variant: the view records the
/// message and carries on. The variants exist so that logs stay useful.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The remote endpoint or access key has not been configured.
    #[error("task store is not configured (set SUPABASE_URL and SUPABASE_ANON_KEY)")]
    NotConfigured,

    /// The request never got a response.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote side answered with an error status.
    #[error("remote error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message reported by the remote side.
        message: String,
    },

    /// No task with the given id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// A row could not be translated into a task.
    #[error("malformed task row: {0}")]
    Decode(String),

    /// A local database error occurred.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store refused the call for some other reason.
    #[error("{0}")]
    Unavailable(String),
}

/// Result type for task store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trait for task storage operations.
///
/// Each method is a single independent call against the backing table; none
/// of them retry, and errors are returned unchanged.
#[async_trait]
#[allow(clippy::missing_errors_doc)]
pub trait TaskStore: Send + Sync {
    /// List all tasks, newest first.
    async fn list(&self) -> StoreResult<Vec<Task>>;

    /// Insert a new, not yet completed task and return the stored row.
    async fn create(&self, text: &str) -> StoreResult<Task>;

    /// Apply a partial update and return the row as confirmed by the store.
    ///
    /// Fails with [`StoreError::NotFound`] if no task has this id.
    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task>;

    /// Delete a task. Returns whether a row was actually removed.
    async fn delete(&self, id: &TaskId) -> StoreResult<bool>;
}

#[async_trait]
impl<S: TaskStore + ?Sized> TaskStore for std::sync::Arc<S> {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        (**self).list().await
    }

    async fn create(&self, text: &str) -> StoreResult<Task> {
        (**self).create(text).await
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &TaskId) -> StoreResult<bool> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<S: TaskStore + ?Sized> TaskStore for Box<S> {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        (**self).list().await
    }

    async fn create(&self, text: &str) -> StoreResult<Task> {
        (**self).create(text).await
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &TaskId) -> StoreResult<bool> {
        (**self).delete(id).await
    }
}
