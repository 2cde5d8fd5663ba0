//! Derived views over the task collection: status filter, search and stats.
//! Everything here is a pure function of its inputs.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::tasks::{Task, TaskError};

/// Coarse status predicate applied before search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Completed,
    Pending,
}

impl Filter {
    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Completed => "completed",
            Filter::Pending => "pending",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Completed => task.completed(),
            Filter::Pending => !task.completed(),
        }
    }

    /// Next filter in the all -> pending -> completed cycle.
    pub fn cycle(self) -> Self {
        match self {
            Filter::All => Filter::Pending,
            Filter::Pending => Filter::Completed,
            Filter::Completed => Filter::All,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Filter::All),
            "completed" => Ok(Filter::Completed),
            "pending" => Ok(Filter::Pending),
            other => Err(TaskError::Validation(format!(
                "unknown filter `{other}` (expected all, completed or pending)"
            ))),
        }
    }
}

/// Search predicate: `query` must already be lower-cased. An empty query
/// matches everything.
pub fn matches_query(task: &Task, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    task.text().to_lowercase().contains(query)
        || task
            .category()
            .is_some_and(|category| category.to_lowercase().contains(query))
}

/// Tasks passing both `filter` and `query`, in collection order.
pub fn visible<'a>(tasks: &'a [Task], filter: Filter, query: &str) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task))
        .filter(|task| matches_query(task, query))
        .collect()
}

/// Collection counters shown alongside the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskStats {
    pub fn of(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed()).count();
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }
}

impl fmt::Display for TaskStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tasks ({} done, {} pending)",
            self.total, self.completed, self.pending
        )
    }
}
