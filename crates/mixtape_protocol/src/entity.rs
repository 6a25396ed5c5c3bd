//! Synced record types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// An opaque server-reported clock value.
///
/// Timestamps order sync rounds; the client never interprets them beyond
/// comparison. The latest fully incorporated timestamp is the sync cursor.
pub type Timestamp = u64;

/// Server-assigned identifier for a playlist.
///
/// Assigned exactly once, when the server acknowledges the playlist's
/// create operation. Absent until then.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(pub String);

impl PlaylistId {
    /// Creates a new playlist ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned identifier for a track within a playlist or the
/// starred list.
///
/// Like [`PlaylistId`], assigned exactly once on create acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    /// Creates a new track ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record that participates in sync.
///
/// Both collections share the same sync surface: a stable client-generated
/// key, a per-record sync flag, a tombstone, and a server identity that is
/// either present or not yet assigned. The push phase and the storage layer
/// operate on records only through this trait.
pub trait SyncEntity: Clone + Send + Sync + 'static {
    /// The client-generated key, stable across the local-to-remote boundary.
    fn uuid(&self) -> Uuid;

    /// True once local state matches the last known server state.
    fn is_synced(&self) -> bool;

    /// Marks the record as matching the server.
    fn mark_synced(&mut self);

    /// True if the record is tombstoned.
    fn is_deleted(&self) -> bool;

    /// True if the server has ever assigned this record an identifier.
    ///
    /// A tombstoned record without a remote identity never existed
    /// server-side and is purged locally with no network call.
    fn has_remote_identity(&self) -> bool;
}

/// A track embedded in a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Client-generated key.
    pub uuid: Uuid,
    /// Server-assigned identifier, absent until acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<TrackId>,
    /// Tombstone flag.
    #[serde(default)]
    pub deleted: bool,
    /// Sequence position within the playlist.
    #[serde(default)]
    pub order: u32,
}

impl Track {
    /// Creates a new locally authored track.
    #[must_use]
    pub fn new(uuid: Uuid, order: u32) -> Self {
        Self {
            uuid,
            internal_id: None,
            deleted: false,
            order,
        }
    }
}

/// An ordered collection of tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// Client-generated key, immutable once assigned.
    pub uuid: Uuid,
    /// Server-assigned identifier, absent until the first create ack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlaylistId>,
    /// Tracks in playback order.
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Tombstone flag.
    #[serde(default)]
    pub deleted: bool,
    /// True once local state matches the last known server state.
    #[serde(default, rename = "sync")]
    pub synced: bool,
    /// Server timestamp of the last acknowledged change. Advisory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
}

impl Playlist {
    /// Creates a new locally authored playlist.
    #[must_use]
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            id: None,
            tracks: Vec::new(),
            deleted: false,
            synced: false,
            updated: None,
        }
    }

    /// Adds a track, preserving insertion order.
    #[must_use]
    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }
}

impl SyncEntity for Playlist {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn is_synced(&self) -> bool {
        self.synced
    }

    fn mark_synced(&mut self) {
        self.synced = true;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn has_remote_identity(&self) -> bool {
        self.id.is_some()
    }
}

/// A track on the user's starred list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarredTrack {
    /// Client-generated key.
    pub uuid: Uuid,
    /// Server-assigned identifier, absent until acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<TrackId>,
    /// Tombstone flag.
    #[serde(default)]
    pub deleted: bool,
    /// Star ordering, preserved on the wire.
    #[serde(default)]
    pub order: u32,
    /// True once local state matches the last known server state.
    #[serde(default, rename = "sync")]
    pub synced: bool,
}

impl StarredTrack {
    /// Creates a new locally starred track.
    #[must_use]
    pub fn new(uuid: Uuid, order: u32) -> Self {
        Self {
            uuid,
            internal_id: None,
            deleted: false,
            order,
            synced: false,
        }
    }
}

impl SyncEntity for StarredTrack {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn is_synced(&self) -> bool {
        self.synced
    }

    fn mark_synced(&mut self) {
        self.synced = true;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn has_remote_identity(&self) -> bool {
        self.internal_id.is_some()
    }
}
