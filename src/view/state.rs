//! View state for the task list and its transitions.
//!
//! Every method here is a plain state transition: it never talks to the
//! store. The controller decides when to call them around store calls.

use crate::tasks::{StoreError, StoreResult, Task, TaskId};

/// Minimum trimmed length of the input before it can be submitted.
pub const MIN_TASK_LEN: usize = 3;

/// Whether a piece of text is long enough to be submitted as a task.
#[must_use]
pub fn is_submittable(text: &str) -> bool {
    text.trim().chars().count() >= MIN_TASK_LEN
}

/// What a submit turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Create a new task with this text.
    Create {
        /// Text of the new task.
        text: String,
    },
    /// Replace the text of the task being edited.
    Update {
        /// Id of the task being edited when the form was submitted.
        id: TaskId,
        /// New text.
        text: String,
    },
}

/// Everything the task list view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListState {
    /// Current contents of the text box.
    pub input_text: String,
    /// Local working set of tasks.
    pub tasks: Vec<Task>,
    /// Whether completed tasks are shown.
    pub show_completed: bool,
    /// Whether a load or form submission is outstanding.
    pub loading: bool,
    /// Last error encountered. Only ever overwritten, never cleared.
    pub error_message: Option<String>,
    /// Task currently being edited, if any.
    pub edit_target: Option<TaskId>,
}

impl Default for TaskListState {
    fn default() -> Self {
        Self {
            input_text: String::new(),
            tasks: Vec::new(),
            show_completed: true,
            loading: false,
            error_message: None,
            edit_target: None,
        }
    }
}

impl TaskListState {
    /// Create an empty state showing all tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Queries ===

    /// Find a task in the local working set.
    #[must_use]
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Whether a task passes the visibility filter.
    #[must_use]
    pub const fn is_visible(&self, task: &Task) -> bool {
        self.show_completed || !task.is_completed
    }

    /// Tasks that pass the visibility filter, in list order.
    pub fn visible_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| self.is_visible(t))
    }

    /// Whether the current input is long enough to submit.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        is_submittable(&self.input_text)
    }

    /// Whether the form is editing an existing task.
    #[must_use]
    pub const fn is_editing(&self) -> bool {
        self.edit_target.is_some()
    }

    /// Label of the submit button.
    #[must_use]
    pub const fn submit_label(&self) -> &'static str {
        if self.is_editing() {
            "Update"
        } else {
            "Save"
        }
    }

    /// Heading above the form.
    #[must_use]
    pub const fn form_heading(&self) -> &'static str {
        if self.is_editing() {
            "Edit your task"
        } else {
            "Add your list"
        }
    }

    // === Local-only transitions ===

    /// Replace the input text.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input_text = text.into();
    }

    /// Flip the visibility filter.
    pub fn toggle_show_completed(&mut self) {
        self.show_completed = !self.show_completed;
    }

    /// Put a task into edit mode, copying its text into the input.
    ///
    /// Returns `false` (and changes nothing) if the task is not in the local set.
    pub fn begin_edit(&mut self, id: &TaskId) -> bool {
        let Some(text) = self.find(id).map(|t| t.text.clone()) else {
            return false;
        };
        self.input_text = text;
        self.edit_target = Some(id.clone());
        true
    }

    /// Leave edit mode and clear the input.
    pub fn cancel_edit(&mut self) {
        self.edit_target = None;
        self.input_text.clear();
    }

    /// Record a failed store call.
    pub fn record_error(&mut self, error: &StoreError) {
        self.error_message = Some(error.to_string());
    }

    // === Transitions around store calls ===

    /// Start the initial load.
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Apply the result of the initial load.
    pub fn finish_load(&mut self, result: StoreResult<Vec<Task>>) {
        match result {
            Ok(tasks) => self.tasks = tasks,
            Err(err) => self.record_error(&err),
        }
        self.loading = false;
    }

    /// Turn the current input into a submission.
    ///
    /// Returns `None` if the input is blank. Otherwise clears the input and
    /// marks the view as loading.
    pub fn begin_submit(&mut self) -> Option<Submission> {
        if self.input_text.trim().is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.input_text);
        self.loading = true;

        Some(match self.edit_target.clone() {
            Some(id) => Submission::Update { id, text },
            None => Submission::Create { text },
        })
    }

    /// Apply the result of a submission.
    ///
    /// A created task is prepended. An updated task replaces its local copy
    /// and ends edit mode. Failures leave the tasks untouched.
    pub fn finish_submit(&mut self, submission: &Submission, result: StoreResult<Task>) {
        match (submission, result) {
            (Submission::Create { .. }, Ok(task)) => self.tasks.insert(0, task),
            (Submission::Update { id, .. }, Ok(task)) => {
                if let Some(slot) = self.tasks.iter_mut().find(|t| &t.id == id) {
                    *slot = task;
                }
                self.edit_target = None;
            }
            (_, Err(err)) => self.record_error(&err),
        }
        self.loading = false;
    }

    /// Optimistically remove a task. Returns whether it was present.
    pub fn remove_task(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| &t.id != id);
        self.tasks.len() != before
    }

    /// Optimistically flip a task's completion flag.
    ///
    /// Returns the new value, or `None` if the task is not in the local set.
    pub fn begin_toggle(&mut self, id: &TaskId) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| &t.id == id)?;
        *task = task.toggled();
        Some(task.is_completed)
    }

    /// Replace the local copy of a task with the store's version.
    ///
    /// Returns `false` if the task is no longer in the local set.
    pub fn replace_task(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    /// Replace the whole working set with an authoritative list.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }
}
