//! The task list view: state, controller, and text rendering.

pub mod controller;
pub mod render;
pub mod state;

pub use controller::TaskList;
pub use render::{render, RowModel, ViewModel};
pub use state::{is_submittable, Submission, TaskListState, MIN_TASK_LEN};
