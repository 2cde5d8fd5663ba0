//! The task store: sole owner of the task collection and of the active
//! filter and search query.
//!
//! Every mutation is written through to the [`TaskPersistence`] adapter
//! before it returns. A failed write never rolls the mutation back; it is
//! handed to the caller in [`Applied::persist_error`] and announced to
//! subscribers as [`StoreEvent::PersistFailed`].
//!
//! When the stored collection exists but cannot be read (wrong key, I/O
//! failure) the store starts empty and refuses every write for the session,
//! so the unreadable data is never replaced.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::{
    tasks::{PersistenceError, Task, TaskDraft, TaskError, TaskId, TaskPersistence},
    view::{self, Filter, TaskStats},
};

const MIN_PREFIX_LEN: usize = 4;

/// Change notification delivered to subscribers after each operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TaskCreated(TaskId),
    TaskToggled { id: TaskId, completed: bool },
    TaskEdited(TaskId),
    TaskDeleted(TaskId),
    FilterChanged(Filter),
    SearchChanged(String),
    PersistFailed(PersistenceError),
}

/// Result of a mutation that succeeded in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T> {
    pub value: T,
    /// Set when the write-through to durable storage failed.
    pub persist_error: Option<PersistenceError>,
}

impl<T> Applied<T> {
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

pub struct TaskStore<P: TaskPersistence> {
    persistence: P,
    tasks: Vec<Task>,
    filter: Filter,
    query: String,
    listeners: Vec<Listener>,
    load_warning: Option<PersistenceError>,
    writes_blocked: bool,
}

impl<P: TaskPersistence> TaskStore<P> {
    /// Load the collection once. Unreadable or malformed data yields an
    /// empty store; the cause is kept in [`TaskStore::load_warning`].
    #[instrument(skip_all)]
    pub fn open(persistence: P) -> Self {
        let (tasks, load_warning) = match persistence.load() {
            Ok(tasks) => (dedupe(tasks), None),
            Err(err) => {
                warn!(%err, "starting with an empty task list");
                (Vec::new(), Some(err))
            }
        };
        // Malformed data is already copied aside by the adapter.
        let writes_blocked = matches!(load_warning, Some(PersistenceError::Read { .. }));
        debug!(count = tasks.len(), writes_blocked, "task store opened");

        Self {
            persistence,
            tasks,
            filter: Filter::default(),
            query: String::new(),
            listeners: Vec::new(),
            load_warning,
            writes_blocked,
        }
    }

    /// Register a change listener. Listeners run synchronously, in
    /// registration order, after the store state is updated.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn load_warning(&self) -> Option<&PersistenceError> {
        self.load_warning.as_ref()
    }

    /// Full collection, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// False while unreadable stored data must be protected from overwrite.
    pub fn can_persist(&self) -> bool {
        !self.writes_blocked
    }

    #[instrument(skip_all)]
    pub fn create(&mut self, draft: TaskDraft) -> Result<Applied<Task>, TaskError> {
        let draft = draft.validate()?;
        let task = Task::create(self.fresh_id(), draft, Utc::now());
        self.tasks.insert(0, task.clone());
        info!(id = %task.id(), "task created");

        let event = StoreEvent::TaskCreated(task.id().clone());
        Ok(self.commit(event, task))
    }

    #[instrument(skip(self))]
    pub fn toggle(&mut self, id: &TaskId) -> Result<Applied<Task>, TaskError> {
        let task = self.find_mut(id)?;
        task.toggle();
        let task = task.clone();
        debug!(completed = task.completed(), "task toggled");

        let event = StoreEvent::TaskToggled {
            id: id.clone(),
            completed: task.completed(),
        };
        Ok(self.commit(event, task))
    }

    /// Replace the editable fields of a task. Text follows the same
    /// non-blank rule as [`TaskStore::create`].
    #[instrument(skip(self, draft))]
    pub fn edit(&mut self, id: &TaskId, draft: TaskDraft) -> Result<Applied<Task>, TaskError> {
        let task = self.find_mut(id)?;
        let draft = draft.validate()?;
        task.apply(draft);
        let task = task.clone();
        info!("task edited");

        Ok(self.commit(StoreEvent::TaskEdited(id.clone()), task))
    }

    /// Remove a task, returning it.
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &TaskId) -> Result<Applied<Task>, TaskError> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.id() == id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        let removed = self.tasks.remove(index);
        info!("task deleted");

        Ok(self.commit(StoreEvent::TaskDeleted(id.clone()), removed))
    }

    /// Change the status filter. Transient; not persisted.
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.emit(&StoreEvent::FilterChanged(filter));
    }

    /// Change the search query (stored lower-cased). Transient; not persisted.
    pub fn set_search(&mut self, query: &str) {
        self.query = query.to_lowercase();
        let event = StoreEvent::SearchChanged(self.query.clone());
        self.emit(&event);
    }

    /// Tasks passing the active filter and search, newest first.
    pub fn visible(&self) -> Vec<&Task> {
        view::visible(&self.tasks, self.filter, &self.query)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::of(&self.tasks)
    }

    /// Flush the whole collection to durable storage.
    #[instrument(skip_all)]
    pub fn persist(&self) -> Result<(), PersistenceError> {
        if self.writes_blocked {
            let reason = match &self.load_warning {
                Some(err) => {
                    format!("stored tasks could not be read ({err}); not overwriting them")
                }
                None => "stored tasks could not be read; not overwriting them".to_string(),
            };
            warn!(%reason, "write refused");
            return Err(PersistenceError::Write { reason });
        }
        self.persistence.save(&self.tasks).inspect_err(|err| {
            warn!(%err, "failed to persist tasks");
        })
    }

    /// Resolve user input to an id: an exact id, or a unique prefix of at
    /// least four characters.
    pub fn resolve_id(&self, input: &str) -> Result<TaskId, TaskError> {
        let input = input.trim();
        if let Some(task) = self.tasks.iter().find(|task| task.id().as_str() == input) {
            return Ok(task.id().clone());
        }
        if input.chars().count() < MIN_PREFIX_LEN {
            return Err(TaskError::Validation(format!(
                "id prefix must be at least {MIN_PREFIX_LEN} characters"
            )));
        }

        let mut candidates = self
            .tasks
            .iter()
            .filter(|task| task.id().as_str().starts_with(input));
        match (candidates.next(), candidates.next()) {
            (Some(task), None) => Ok(task.id().clone()),
            (Some(_), Some(_)) => Err(TaskError::Validation(format!(
                "id prefix `{input}` matches more than one task"
            ))),
            (None, _) => Err(TaskError::NotFound(TaskId::from_stored(input))),
        }
    }

    fn find_mut(&mut self, id: &TaskId) -> Result<&mut Task, TaskError> {
        self.tasks
            .iter_mut()
            .find(|task| task.id() == id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    fn fresh_id(&self) -> TaskId {
        loop {
            let id = TaskId::generate();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn commit<T>(&mut self, event: StoreEvent, value: T) -> Applied<T> {
        let persist_error = self.persist().err();
        self.emit(&event);
        if let Some(err) = &persist_error {
            self.emit(&StoreEvent::PersistFailed(err.clone()));
        }
        Applied {
            value,
            persist_error,
        }
    }

    fn emit(&mut self, event: &StoreEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

fn dedupe(tasks: Vec<Task>) -> Vec<Task> {
    let before = tasks.len();
    let mut seen = HashSet::new();
    let unique: Vec<Task> = tasks
        .into_iter()
        .filter(|task| seen.insert(task.id().clone()))
        .collect();
    if unique.len() != before {
        warn!(
            dropped = before - unique.len(),
            "dropped stored tasks with duplicate ids"
        );
    }
    unique
}
