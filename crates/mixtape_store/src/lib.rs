//! # Mixtape Store
//!
//! Local storage contracts for the Mixtape sync engine.
//!
//! This crate provides:
//! - [`EntityStore`] - the per-collection contract the engine requires
//!   from local storage: upsert, delete-by-key, and query-unsynced
//! - [`MemoryStore`] - an in-memory reference implementation
//! - [`CursorStore`] - durable storage for the last-synced cursor, kept
//!   apart from entity storage
//!
//! Embedders back [`EntityStore`] with whatever durable store the platform
//! offers; the engine only ever addresses records by their client key and
//! their sync flag.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cursor;
mod error;
mod memory;
mod store;

pub use cursor::{CursorStore, FileCursorStore, MemoryCursorStore};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::EntityStore;
