//! # Mixtape Sync Engine
//!
//! Offline-first, bidirectional sync engine for playlists and the
//! starred-track list.
//!
//! This crate provides:
//! - Pull reconciliation (server-authoritative merge of remote deltas)
//! - Push reconciliation (classify local changes, fan out, commit acks)
//! - Per-direction single-flight guards
//! - Cursor advancement after fully successful rounds
//! - HTTP transport abstraction
//!
//! ## Architecture
//!
//! The engine implements a **pull-then-push** synchronization model:
//! 1. Pull remote changes since the stored cursor (server is authoritative)
//! 2. Push local unsynced changes and reconcile server-assigned identifiers
//! 3. Advance the cursor only after both phases succeed
//!
//! Local changes are detected without a change log: every record carries a
//! sync flag, and the unsynced set is exactly what push considers.
//!
//! ## Key Invariants
//!
//! - Pull always happens before push
//! - A record's client `uuid` never changes; server identifiers are
//!   assigned exactly once, on create acknowledgment
//! - A tombstone that never reached the server is purged locally with no
//!   network call
//! - The stored cursor never regresses; a failed round leaves it untouched
//! - No record is flagged synced unless its own acknowledgment was processed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod pull;
mod push;
mod state;
mod transport;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpTransport};
pub use pull::PullReconciler;
pub use push::PushReconciler;
pub use state::{
    PhaseLock, PhaseSlot, PhaseState, SyncDirection, SyncEvent, SyncGuard, SyncOrchestrator,
    SyncStats, UserIdentity,
};
pub use transport::{MockTransport, SentRequest, SyncTransport};
