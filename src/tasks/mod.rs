//! Task storage.
//!
//! This module provides:
//! - the [`Task`] model and partial updates ([`TaskPatch`])
//! - the async [`TaskStore`] trait with a single [`StoreError`] type
//! - [`RestTaskStore`], talking to a hosted PostgREST table
//! - [`SqliteTaskStore`], a local table with the same semantics
//!
//! # Example
//!
//! ```no_run
//! use mytodo::config::StoreConfig;
//! use mytodo::tasks::{RestTaskStore, TaskPatch, TaskStore};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::resolve(None, std::path::Path::new("."))?;
//! let store = RestTaskStore::new(&config)?;
//!
//! let task = store.create("Buy milk").await?;
//! store.update(&task.id, &TaskPatch::completed(true)).await?;
//! let tasks = store.list().await?;
//! # Ok(())
//! # }
//! ```

pub mod models;
pub mod rest;
pub mod sqlite;
pub mod store;

pub use models::{Task, TaskId, TaskPatch};
pub use rest::RestTaskStore;
pub use sqlite::SqliteTaskStore;
pub use store::{StoreError, StoreResult, TaskStore};
