//! # `mytodo`
//!
//! A todo list backed by a hosted PostgREST table, with an optimistic
//! view controller that keeps the local list in step with the store.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod tasks;
pub mod templates;
pub mod testing;
pub mod view;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
