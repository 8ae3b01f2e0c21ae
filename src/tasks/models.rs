//! Task model types shared by every store backend and the view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque identifier assigned by the store when a task is created.
///
/// Hosted tables usually key tasks by a `bigint` identity column, but a
/// `uuid` key works just as well, so the id is kept as its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create an id from its textual form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the textual form of the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => Self::from(n),
            RawId::Text(s) => Self(s),
        })
    }
}

/// A task in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier, never reused.
    pub id: TaskId,
    /// Free-form task text.
    pub text: String,
    /// Whether the task has been completed.
    pub is_completed: bool,
    /// Store-assigned creation time. Only used for ordering.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Return a copy of this task with the completion flag flipped.
    #[must_use]
    pub fn toggled(&self) -> Self {
        Self { is_completed: !self.is_completed, ..self.clone() }
    }
}

/// Fields that can be changed on an existing task.
///
/// Only the fields that are `Some` are written; the rest stay untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskPatch {
    /// New text (if Some).
    pub text: Option<String>,
    /// New completion flag (if Some).
    pub is_completed: Option<bool>,
}

impl TaskPatch {
    /// A patch that only replaces the text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    /// A patch that only sets the completion flag.
    #[must_use]
    pub fn completed(is_completed: bool) -> Self {
        Self { is_completed: Some(is_completed), ..Self::default() }
    }

    /// Check if any fields are set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_none() && self.is_completed.is_none()
    }

    /// Apply this patch to a task in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref text) = self.text {
            task.text.clone_from(text);
        }
        if let Some(is_completed) = self.is_completed {
            task.is_completed = is_completed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: TaskId::from(1),
            text: "Buy milk".to_string(),
            is_completed: false,
            created_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_task_id_accepts_numbers_and_strings() {
        let numeric: TaskId = serde_json::from_str("42").unwrap();
        assert_eq!(numeric.as_str(), "42");

        let uuid: TaskId = serde_json::from_str("\"5f1c7d2e-0000-4000-8000-000000000000\"").unwrap();
        assert_eq!(uuid.as_str(), "5f1c7d2e-0000-4000-8000-000000000000");
    }

    #[test]
    fn test_task_serializes_in_camel_case() {
        let json = serde_json::to_value(sample_task()).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["text"], "Buy milk");
        assert_eq!(json["isCompleted"], false);
        assert!(json["createdAt"].is_string());
        assert!(json.get("is_completed").is_none());
    }

    #[test]
    fn test_toggled_flips_only_completion() {
        let task = sample_task();
        let toggled = task.toggled();
        assert!(toggled.is_completed);
        assert_eq!(toggled.id, task.id);
        assert_eq!(toggled.text, task.text);
        assert_eq!(toggled.created_at, task.created_at);
        assert_eq!(toggled.toggled(), task);
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut task = sample_task();
        TaskPatch::completed(true).apply_to(&mut task);
        assert!(task.is_completed);
        assert_eq!(task.text, "Buy milk");

        TaskPatch::text("Buy oat milk").apply_to(&mut task);
        assert_eq!(task.text, "Buy oat milk");
        assert!(task.is_completed);
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::text("x").is_empty());
        assert!(!TaskPatch::completed(false).is_empty());
    }
}
