use std::path::PathBuf;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use ticklist_core::storage::{KeyValueStore, StoreError};
use tracing::instrument;

use crate::{
    file_store::{file_name, read_file, remove_file, storage_err, write_atomic},
    key_provider::{KeyMaterial, KeyProvider},
};

/// AES-GCM encrypted file-backed store. Keys come from a [`KeyProvider`]
/// (OS keyring in production).
pub struct EncryptedFileStore<P: KeyProvider> {
    root: PathBuf,
    key_provider: P,
}

impl<P: KeyProvider> EncryptedFileStore<P> {
    pub fn new(root: impl Into<PathBuf>, key_provider: P) -> Self {
        Self {
            root: root.into(),
            key_provider,
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name(key, "enc"))
    }

    fn cipher(&self) -> Result<Aes256Gcm, StoreError> {
        let material = self
            .key_provider
            .get_or_create()
            .map_err(|e| StoreError::Storage {
                reason: format!("key provider: {e}"),
            })?;
        build_cipher(&material)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredBlob {
    nonce: String,
    ciphertext: String,
}

impl<P: KeyProvider> KeyValueStore for EncryptedFileStore<P> {
    #[instrument(skip_all, fields(key = %key))]
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let cipher = self.cipher()?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, value)
            .map_err(|e| StoreError::Storage {
                reason: format!("encrypt failed: {e}"),
            })?;

        let blob = StoredBlob {
            nonce: URL_SAFE_NO_PAD.encode(nonce.as_slice()),
            ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        };
        let json = serde_json::to_vec(&blob).map_err(storage_err)?;
        write_atomic(&self.path_for(key), &json)
    }

    #[instrument(skip_all, fields(key = %key))]
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let raw = read_file(&self.path_for(key), key)?;
        let blob: StoredBlob = serde_json::from_slice(&raw).map_err(storage_err)?;
        let cipher = self.cipher()?;

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(blob.nonce)
            .map_err(|e| StoreError::Storage {
                reason: format!("nonce decode failed: {e}"),
            })?;
        if nonce_bytes.len() != 12 {
            return Err(StoreError::Storage {
                reason: format!("nonce must be 12 bytes, got {}", nonce_bytes.len()),
            });
        }
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = URL_SAFE_NO_PAD
            .decode(blob.ciphertext)
            .map_err(|e| StoreError::Storage {
                reason: format!("ciphertext decode failed: {e}"),
            })?;

        cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|e| StoreError::Storage {
                reason: format!("decrypt failed: {e}"),
            })
    }

    #[instrument(skip_all, fields(key = %key))]
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        remove_file(&self.path_for(key))
    }
}

fn build_cipher(material: &KeyMaterial) -> Result<Aes256Gcm, StoreError> {
    Aes256Gcm::new_from_slice(&material.bytes).map_err(|e| StoreError::Storage {
        reason: format!("cipher init failed: {e}"),
    })
}
