use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque task identifier. Assigned once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    /// Fresh random identifier (UUID v4, simple hex form).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an identifier read back from storage.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters used in list output.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task priority; `Low` when unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(TaskError::Validation(format!(
                "unknown priority `{other}` (expected low, medium or high)"
            ))),
        }
    }
}

/// Task entity. `id` and `created_at` are fixed once the task exists; the
/// remaining fields change only through the store's toggle and edit operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    text: String,
    completed: bool,
    priority: Priority,
    due_date: Option<NaiveDate>,
    category: Option<String>,
    created_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh, pending task from an already validated draft.
    pub(crate) fn create(id: TaskId, draft: ValidDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            text: draft.text,
            completed: false,
            priority: draft.priority,
            due_date: draft.due_date,
            category: draft.category,
            // Persisted timestamps carry millisecond precision.
            created_at: now.trunc_subsecs(3),
        }
    }

    /// Rehydrate a task exactly as it was persisted.
    pub fn restore(parts: TaskParts) -> Self {
        Self {
            id: parts.id,
            text: parts.text,
            completed: parts.completed,
            priority: parts.priority,
            due_date: parts.due_date,
            category: parts.category.filter(|c| !c.trim().is_empty()),
            created_at: parts.created_at,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Pending and due strictly before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < today)
    }

    pub(crate) fn toggle(&mut self) {
        self.completed = !self.completed;
    }

    pub(crate) fn apply(&mut self, draft: ValidDraft) {
        self.text = draft.text;
        self.priority = draft.priority;
        self.due_date = draft.due_date;
        self.category = draft.category;
    }
}

/// Raw field set used by persistence adapters to rebuild a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskParts {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User-editable fields, as submitted to create or edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub category: Option<String>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Draft pre-filled with a task's current values, for edit forms.
    pub fn from_task(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            priority: task.priority,
            due_date: task.due_date,
            category: task.category.clone(),
        }
    }

    /// Trim text and category; reject blank text, drop blank category.
    pub(crate) fn validate(self) -> Result<ValidDraft, TaskError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(TaskError::Validation(
                "task text must not be empty".to_string(),
            ));
        }
        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(ValidDraft {
            text: text.to_string(),
            priority: self.priority,
            due_date: self.due_date,
            category,
        })
    }
}

#[derive(Debug)]
pub(crate) struct ValidDraft {
    text: String,
    priority: Priority,
    due_date: Option<NaiveDate>,
    category: Option<String>,
}

/// Expected, recoverable failures of task operations. State is unchanged
/// whenever one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Rejected input (blank text, unknown filter or priority, bad id prefix).
    #[error("invalid input: {0}")]
    Validation(String),
    /// No task with this id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),
}

/// Failures reading or writing the durable task collection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("failed to read tasks: {reason}")]
    Read { reason: String },
    #[error("failed to write tasks: {reason}")]
    Write { reason: String },
    /// Stored data exists but is not a valid task collection.
    #[error("stored tasks are malformed: {reason}")]
    Malformed { reason: String },
}

/// Durable home of the task collection: loaded once, fully replaced on save.
pub trait TaskPersistence {
    /// Read the stored collection; a missing collection is an empty one.
    fn load(&self) -> Result<Vec<Task>, PersistenceError>;

    /// Replace the stored collection with `tasks`, preserving order.
    fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError>;
}

impl<P: TaskPersistence + ?Sized> TaskPersistence for Box<P> {
    fn load(&self) -> Result<Vec<Task>, PersistenceError> {
        (**self).load()
    }

    fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        (**self).save(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_validation_trims_and_drops_blank_category() {
        let valid = TaskDraft::new("  Buy milk  ")
            .category("   ")
            .validate()
            .expect("valid draft");
        assert_eq!(valid.text, "Buy milk");
        assert_eq!(valid.category, None);
    }

    #[test]
    fn draft_validation_rejects_whitespace_text() {
        let err = TaskDraft::new(" \t\n").validate().expect_err("blank text");
        assert!(matches!(err, TaskError::Validation(_)));
    }

    #[test]
    fn created_task_is_pending_with_millisecond_timestamp() {
        let now = Utc::now();
        let task = Task::create(
            TaskId::generate(),
            TaskDraft::new("Ship").validate().expect("valid"),
            now,
        );
        assert!(!task.completed());
        assert_eq!(task.priority(), Priority::Low);
        assert_eq!(task.created_at(), now.trunc_subsecs(3));
    }

    #[test]
    fn overdue_only_when_pending_and_past_due() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).expect("date");
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).expect("date");
        let mut task = Task::create(
            TaskId::generate(),
            TaskDraft::new("Renew passport")
                .due_date(Some(yesterday))
                .validate()
                .expect("valid"),
            Utc::now(),
        );
        assert!(task.is_overdue(today));
        assert!(!task.is_overdue(yesterday));

        task.toggle();
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn priority_parses_case_insensitively_and_rejects_unknown() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" medium ".parse::<Priority>(), Ok(Priority::Medium));
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(TaskError::Validation(_))
        ));
    }

    #[test]
    fn short_id_is_prefix() {
        let id = TaskId::generate();
        assert_eq!(id.short().len(), 8);
        assert!(id.as_str().starts_with(id.short()));
        assert_eq!(TaskId::from_stored("42").short(), "42");
    }
}
