use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tempfile::NamedTempFile;
use ticklist_core::storage::{KeyValueStore, StoreError};
use tracing::instrument;

/// Plaintext file-backed store: one file per key under `root`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name(key, "json"))
    }
}

impl KeyValueStore for FileStore {
    #[instrument(skip_all, fields(key = %key))]
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        write_atomic(&self.path_for(key), value)
    }

    #[instrument(skip_all, fields(key = %key))]
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        read_file(&self.path_for(key), key)
    }

    #[instrument(skip_all, fields(key = %key))]
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        remove_file(&self.path_for(key))
    }
}

/// Readable file name for simple keys, base64url otherwise.
pub(crate) fn file_name(key: &str, extension: &str) -> String {
    let simple = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if simple {
        format!("{key}.{extension}")
    } else {
        format!("{}.{extension}", URL_SAFE_NO_PAD.encode(key))
    }
}

/// Write through a temp file in the same directory, then rename over the
/// target so readers never observe a partial value.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Storage {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(bytes).map_err(storage_err)?;
    tmp.as_file().sync_all().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

pub(crate) fn read_file(path: &Path, key: &str) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            StoreError::NotFound {
                key: key.to_string(),
            }
        } else {
            storage_err(err)
        }
    })
}

pub(crate) fn remove_file(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(storage_err(err)),
    }
}

pub(crate) fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_writes_readable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path().join("nested"));

        store.put("tasks", b"[]").expect("put");
        store.put("tasks", b"[1]").expect("overwrite");

        assert_eq!(store.get("tasks").expect("get"), b"[1]");
        assert_eq!(store.path_for("tasks"), dir.path().join("nested/tasks.json"));
    }

    #[test]
    fn missing_key_is_not_found_and_delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());

        let err = store.get("tasks").expect_err("missing");
        assert_eq!(
            err,
            StoreError::NotFound {
                key: "tasks".into()
            }
        );
        store.delete("tasks").expect("delete missing");
    }

    #[test]
    fn unusual_keys_are_encoded() {
        assert_eq!(file_name("tasks.bak", "json"), "tasks.bak.json");
        assert_eq!(file_name("health/probe", "json"), "aGVhbHRoL3Byb2Jl.json");
        assert_eq!(file_name("../escape", "enc"), "Li4vZXNjYXBl.enc");
    }
}
