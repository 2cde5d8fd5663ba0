//! Durable key-value stores for Ticklist data.
//! `FileStore` keeps plaintext files; `EncryptedFileStore` wraps each value in
//! AES-GCM using a key from a [`key_provider::KeyProvider`].

pub mod encrypted_store;
pub mod file_store;
pub mod key_provider;
