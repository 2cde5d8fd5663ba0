//! Core abstractions for Ticklist: the task model, the task store and the
//! storage contracts it persists through.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod storage;
pub mod store;
pub mod tasks;
pub mod view;
