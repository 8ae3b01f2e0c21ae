//! Text rendering of the task list view.

use crate::error::Result;
use crate::templates;
use crate::view::state::{TaskListState, MIN_TASK_LEN};
use serde::Serialize;

/// One visible row of the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowModel {
    /// Task id.
    pub id: String,
    /// Task text.
    pub text: String,
    /// Whether the task is completed.
    pub done: bool,
    /// Whether the task is the current edit target.
    pub editing: bool,
}

/// Everything the list template needs, derived from the view state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    /// Form heading.
    pub heading: &'static str,
    /// Current input text.
    pub input: String,
    /// Submit button label.
    pub submit_label: &'static str,
    /// Whether the submit button is enabled.
    pub can_submit: bool,
    /// Minimum input length.
    pub min_len: usize,
    /// Whether completed tasks are shown.
    pub show_completed: bool,
    /// Whether a request from the form is outstanding.
    pub loading: bool,
    /// Whether the list is empty (only while not loading).
    pub empty: bool,
    /// Last error, if any.
    pub error: Option<String>,
    /// Visible rows, in list order.
    pub rows: Vec<RowModel>,
}

impl ViewModel {
    /// Build the view model for a state.
    #[must_use]
    pub fn from_state(state: &TaskListState) -> Self {
        let rows = state
            .visible_tasks()
            .map(|task| RowModel {
                id: task.id.to_string(),
                text: task.text.clone(),
                done: task.is_completed,
                editing: state.edit_target.as_ref() == Some(&task.id),
            })
            .collect();

        Self {
            heading: state.form_heading(),
            input: state.input_text.clone(),
            submit_label: state.submit_label(),
            can_submit: state.can_submit(),
            min_len: MIN_TASK_LEN,
            show_completed: state.show_completed,
            loading: state.loading,
            empty: !state.loading && state.tasks.is_empty(),
            error: state.error_message.clone(),
            rows,
        }
    }
}

/// Render the view as plain text.
///
/// # Errors
///
/// Returns an error if the list template fails to render.
pub fn render(state: &TaskListState) -> Result<String> {
    templates::render_value("view/task_list.tera", &ViewModel::from_state(state))
}
