//! # Mixtape Protocol
//!
//! Entity model and wire schemas for the Mixtape sync engine.
//!
//! This crate defines:
//! - The synced record types (playlists, tracks, starred tracks)
//! - Server-assigned identifier newtypes
//! - Request and response schemas for every sync endpoint
//!
//! Records are keyed by a client-generated `uuid` from the moment they are
//! created locally. Server-assigned identifiers (`PlaylistId`, `TrackId`)
//! are filled in only after the server acknowledges a create, and are never
//! reassigned afterwards.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod messages;

pub use entity::{Playlist, PlaylistId, StarredTrack, SyncEntity, Timestamp, Track, TrackId};
pub use messages::{
    ChangesResponse, CreatePlaylistResponse, DeletePlaylistResponse, PlaylistDelta,
    RemotePlaylist, StarAck, StarDelta, StarResponse, StarredChanges, TrackAck,
    UpdatePlaylistResponse,
};
