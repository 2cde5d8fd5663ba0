//! Task persistence over a key-value store: the whole collection lives as a
//! JSON array under a single key and is fully replaced on every save.

mod record;

use ticklist_core::{
    storage::{KeyValueStore, StoreError},
    tasks::{PersistenceError, Task, TaskPersistence},
};
use tracing::{debug, instrument, warn};

use crate::record::TaskRecord;

/// Key holding the serialized collection.
pub const TASKS_KEY: &str = "tasks";
/// Key receiving the raw bytes of a collection that failed to parse.
pub const BACKUP_KEY: &str = "tasks.bak";

/// Task persistence backed by any [`KeyValueStore`].
pub struct KvTaskRepo<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> KvTaskRepo<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Keep a copy of unreadable data before the next save replaces it.
    fn backup(&self, raw: &[u8]) {
        match self.store.put(BACKUP_KEY, raw) {
            Ok(()) => warn!(key = BACKUP_KEY, "copied malformed tasks aside"),
            Err(err) => warn!(%err, "failed to back up malformed tasks"),
        }
    }
}

/// Serialize a collection in stored order.
pub fn encode(tasks: &[Task]) -> Result<Vec<u8>, serde_json::Error> {
    let records: Vec<TaskRecord> = tasks.iter().map(TaskRecord::from).collect();
    serde_json::to_vec(&records)
}

/// Parse a stored collection. `null` reads as empty.
pub fn decode(bytes: &[u8]) -> Result<Vec<Task>, String> {
    let records: Option<Vec<TaskRecord>> =
        serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    records
        .unwrap_or_default()
        .into_iter()
        .map(Task::try_from)
        .collect()
}

impl<S: KeyValueStore> TaskPersistence for KvTaskRepo<S> {
    #[instrument(skip(self))]
    fn load(&self) -> Result<Vec<Task>, PersistenceError> {
        let bytes = match self.store.get(TASKS_KEY) {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound { .. }) => {
                debug!("no stored tasks yet");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(PersistenceError::Read {
                    reason: err.to_string(),
                })
            }
        };

        match decode(&bytes) {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded tasks");
                Ok(tasks)
            }
            Err(reason) => {
                self.backup(&bytes);
                Err(PersistenceError::Malformed { reason })
            }
        }
    }

    #[instrument(skip_all, fields(count = tasks.len()))]
    fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let bytes = encode(tasks).map_err(|e| PersistenceError::Write {
            reason: e.to_string(),
        })?;
        self.store
            .put(TASKS_KEY, &bytes)
            .map_err(|e| PersistenceError::Write {
                reason: e.to_string(),
            })
    }
}
