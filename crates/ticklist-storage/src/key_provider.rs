use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::debug;

/// Environment variable holding a base64-encoded 32-byte data key.
pub const DATA_KEY_ENV: &str = "TICKLIST_DATA_KEY";

/// Key material used for encryption at rest.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Identifier for logging/rotation (never log key bytes).
    pub id: String,
    /// 256-bit symmetric key.
    pub bytes: [u8; 32],
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("key unavailable: {0}")]
    Unavailable(String),
}

/// Provides access to the data encryption key.
pub trait KeyProvider: Send + Sync {
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError>;
}

impl<P: KeyProvider + ?Sized> KeyProvider for Box<P> {
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        (**self).get_or_create()
    }
}

/// OS keyring-backed provider. Generates and stores a key on first use.
pub struct KeyringProvider {
    service: String,
    account: String,
}

impl KeyringProvider {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }
}

impl KeyProvider for KeyringProvider {
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| KeyError::Keyring(e.to_string()))?;

        match entry.get_password() {
            Ok(secret) => decode_key(&secret),
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, "generating new data key");
                let material = generate_key();
                entry
                    .set_password(&encode_key(&material))
                    .map_err(|e| KeyError::Keyring(e.to_string()))?;
                Ok(material)
            }
            Err(err) => Err(KeyError::Keyring(err.to_string())),
        }
    }
}

/// Reads the key from [`DATA_KEY_ENV`]; never generates one.
#[derive(Debug, Default, Clone)]
pub struct EnvKeyProvider;

impl EnvKeyProvider {
    /// True when the environment carries a data key.
    pub fn is_configured() -> bool {
        std::env::var_os(DATA_KEY_ENV).is_some()
    }
}

impl KeyProvider for EnvKeyProvider {
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let secret = std::env::var(DATA_KEY_ENV)
            .map_err(|e| KeyError::Unavailable(format!("{DATA_KEY_ENV}: {e}")))?;
        decode_key(secret.trim())
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
}

impl KeyProvider for InMemoryKeyProvider {
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Unavailable(format!("lock poisoned: {err}")))?;

        Ok(guard.get_or_insert_with(generate_key).clone())
    }
}

fn generate_key() -> KeyMaterial {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    KeyMaterial {
        id: "default".to_string(),
        bytes,
    }
}

/// Base64 form of a key, as accepted by [`EnvKeyProvider`].
pub fn encode_key(material: &KeyMaterial) -> String {
    general_purpose::STANDARD.encode(material.bytes)
}

fn decode_key(secret: &str) -> Result<KeyMaterial, KeyError> {
    let bytes = general_purpose::STANDARD
        .decode(secret)
        .map_err(|e| KeyError::Decode(e.to_string()))?;

    let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        KeyError::Decode(format!("expected 32 bytes, got {}", bytes.len()))
    })?;
    Ok(KeyMaterial {
        id: "default".to_string(),
        bytes,
    })
}
