use chrono::NaiveDate;
use ticklist_core::tasks::{Priority, Task, TaskDraft, TaskError, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Text,
    Priority,
    Due,
    Category,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Text, Field::Priority, Field::Due, Field::Category];

    pub fn label(self) -> &'static str {
        match self {
            Field::Text => "Task",
            Field::Priority => "Priority",
            Field::Due => "Due (YYYY-MM-DD)",
            Field::Category => "Category",
        }
    }

    fn next(self) -> Self {
        match self {
            Field::Text => Field::Priority,
            Field::Priority => Field::Due,
            Field::Due => Field::Category,
            Field::Category => Field::Text,
        }
    }

    fn prev(self) -> Self {
        match self {
            Field::Text => Field::Category,
            Field::Priority => Field::Text,
            Field::Due => Field::Priority,
            Field::Category => Field::Due,
        }
    }
}

/// State of the add/edit dialog. Lives in the UI, never in the task store:
/// `target` is `None` while adding and the edited task's id while editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub target: Option<TaskId>,
    pub text: String,
    pub priority: Priority,
    pub due: String,
    pub category: String,
    pub focus: Field,
}

impl EditSession {
    pub fn adding() -> Self {
        Self {
            target: None,
            text: String::new(),
            priority: Priority::Low,
            due: String::new(),
            category: String::new(),
            focus: Field::Text,
        }
    }

    pub fn editing(task: &Task) -> Self {
        Self {
            target: Some(task.id().clone()),
            text: task.text().to_string(),
            priority: task.priority(),
            due: task
                .due_date()
                .map(|due| due.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            category: task.category().unwrap_or_default().to_string(),
            focus: Field::Text,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.target.is_some() {
            "Edit task"
        } else {
            "New task"
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Printable value of a field.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Text => &self.text,
            Field::Priority => self.priority.as_str(),
            Field::Due => &self.due,
            Field::Category => &self.category,
        }
    }

    pub fn insert(&mut self, c: char) {
        match self.focus {
            Field::Text => self.text.push(c),
            Field::Due => self.due.push(c),
            Field::Category => self.category.push(c),
            Field::Priority => match c {
                'l' | 'L' => self.priority = Priority::Low,
                'm' | 'M' => self.priority = Priority::Medium,
                'h' | 'H' => self.priority = Priority::High,
                ' ' => self.cycle_priority(true),
                _ => {}
            },
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            Field::Text => {
                self.text.pop();
            }
            Field::Due => {
                self.due.pop();
            }
            Field::Category => {
                self.category.pop();
            }
            Field::Priority => {}
        }
    }

    pub fn cycle_priority(&mut self, forward: bool) {
        self.priority = match (self.priority, forward) {
            (Priority::Low, true) | (Priority::High, false) => Priority::Medium,
            (Priority::Medium, true) | (Priority::Low, false) => Priority::High,
            (Priority::High, true) | (Priority::Medium, false) => Priority::Low,
        };
    }

    /// Parse the form into a draft; blank-text rules are left to the store.
    pub fn to_draft(&self) -> Result<TaskDraft, TaskError> {
        let due_date = match self.due.trim() {
            "" => None,
            raw => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                TaskError::Validation(format!("due date `{raw}` is not YYYY-MM-DD"))
            })?),
        };
        let mut draft = TaskDraft::new(self.text.clone())
            .priority(self.priority)
            .due_date(due_date);
        draft.category = Some(self.category.clone());
        Ok(draft)
    }
}
