use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ticklist_core::tasks::{Priority, Task, TaskId, TaskParts};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stored shape of one task. Absent optional values are written as `""`;
/// `null` and missing fields are tolerated on read.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskRecord {
    id: RecordId,
    text: String,
    #[serde(default)]
    completed: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    priority: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    due_date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    category: String,
    created_at: String,
}

/// Ids are written as strings; numeric ids from older data are accepted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Number(u64),
    Text(String),
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: RecordId::Text(task.id().to_string()),
            text: task.text().to_string(),
            completed: task.completed(),
            priority: task.priority().as_str().to_string(),
            due_date: task
                .due_date()
                .map(|due| due.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            category: task.category().unwrap_or_default().to_string(),
            created_at: task
                .created_at()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = String;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let id = match record.id {
            RecordId::Number(n) => n.to_string(),
            RecordId::Text(s) if !s.trim().is_empty() => s,
            RecordId::Text(_) => return Err("task id must not be empty".to_string()),
        };

        let priority = if record.priority.trim().is_empty() {
            Priority::default()
        } else {
            record
                .priority
                .parse::<Priority>()
                .map_err(|e| format!("task {id}: {e}"))?
        };

        let due_date = match record.due_date.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .map_err(|e| format!("task {id}: bad dueDate `{raw}`: {e}"))?,
            ),
        };

        let created_at = DateTime::parse_from_rfc3339(&record.created_at)
            .map_err(|e| format!("task {id}: bad createdAt `{}`: {e}", record.created_at))?
            .with_timezone(&Utc);

        Ok(Task::restore(TaskParts {
            id: TaskId::from_stored(id),
            text: record.text,
            completed: record.completed,
            priority,
            due_date,
            category: Some(record.category),
            created_at,
        }))
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
