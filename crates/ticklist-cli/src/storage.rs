use std::path::{Path, PathBuf};

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use ticklist_core::{storage::KeyValueStore, store::TaskStore};
use ticklist_storage::{
    encrypted_store::EncryptedFileStore,
    file_store::FileStore,
    key_provider::{EnvKeyProvider, KeyProvider, KeyringProvider},
};
use ticklist_task::KvTaskRepo;
use tracing::debug;

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "TICKLIST_DATA_DIR";

pub type LocalTaskStore = TaskStore<KvTaskRepo<Box<dyn KeyValueStore>>>;

/// Resolve the default data directory for Ticklist.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("ticklist"))
}

/// Data directory: environment override, then config, then the platform default.
pub fn resolve_data_dir(config: &Config, env_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(root) = env_override.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(root);
    }
    if let Some(root) = &config.data_dir {
        return Ok(root.clone());
    }
    default_data_dir()
}

pub fn data_dir_from_env(config: &Config) -> Result<PathBuf> {
    resolve_data_dir(config, std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

/// Build the key-value store selected by config.
pub fn store_from_config(config: &Config) -> Result<Box<dyn KeyValueStore>> {
    let root = data_dir_from_env(config)?;
    Ok(store_at(&root, config.storage.encrypt))
}

fn store_at(root: &Path, encrypt: bool) -> Box<dyn KeyValueStore> {
    if !encrypt {
        debug!(?root, "initializing plaintext store");
        return Box::new(FileStore::new(root));
    }

    let keys: Box<dyn KeyProvider> = if EnvKeyProvider::is_configured() {
        debug!(?root, "initializing encrypted store (env key)");
        Box::new(EnvKeyProvider)
    } else {
        debug!(?root, "initializing encrypted store (keyring)");
        Box::new(KeyringProvider::new("ticklist", "data-key"))
    };
    Box::new(EncryptedFileStore::new(root, keys))
}

/// Open the task store over the configured storage.
pub fn open_task_store(config: &Config) -> Result<LocalTaskStore> {
    let store = store_from_config(config)?;
    Ok(TaskStore::open(KvTaskRepo::new(store)))
}

/// Helper for tests to construct a plaintext store rooted at a temp dir.
#[cfg(test)]
pub fn test_store(root: &Path) -> Box<dyn KeyValueStore> {
    store_at(root, false)
}
