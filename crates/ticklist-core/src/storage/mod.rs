//! Key-value storage contract shared by the task adapter and the concrete
//! file-backed stores.

mod kv_store;

pub use kv_store::{InMemoryStore, KeyValueStore, StoreError};
