//! Request and response schemas, one typed pair per endpoint.
//!
//! The remote API reports every mutation with a `time` field; the largest
//! such value a sync round processes becomes the next cursor candidate.
//! All response shapes use named fields so that reconciliation never
//! depends on positional array conventions, with one deliberate exception:
//! [`StarResponse::added`] is matched positionally against the order-sorted
//! list the client submitted, which is the wire contract for star ordering.

use crate::entity::{Playlist, PlaylistId, StarredTrack, Timestamp, Track, TrackId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side changes since a cursor, from `GET /data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesResponse {
    /// Playlists created, modified, or tombstoned since the cursor.
    #[serde(default)]
    pub playlists: Vec<RemotePlaylist>,
    /// Starred-list changes since the cursor.
    #[serde(default)]
    pub starred: StarredChanges,
    /// The server clock as of this snapshot; the next cursor candidate.
    #[serde(default)]
    pub time: Option<Timestamp>,
}

/// Starred-list portion of a [`ChangesResponse`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarredChanges {
    /// The changed starred tracks.
    #[serde(default)]
    pub tracks: Vec<StarredTrack>,
}

/// A playlist as reported by the server on pull.
///
/// Unlike a local [`Playlist`], the `uuid` is optional: a well-behaved
/// server echoes the client key back, but the merge assigns a fresh one
/// if it is ever missing rather than dropping the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePlaylist {
    /// Client-generated key, echoed by the server.
    #[serde(default)]
    pub uuid: Option<Uuid>,
    /// Server-assigned identifier.
    #[serde(default)]
    pub id: Option<PlaylistId>,
    /// Tracks in playback order.
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Tombstone flag; a tombstoned playlist is deleted locally.
    #[serde(default)]
    pub deleted: bool,
    /// Server timestamp of the last change.
    #[serde(default)]
    pub updated: Option<Timestamp>,
}

impl RemotePlaylist {
    /// Converts into a local record under the given client key.
    ///
    /// The result is not yet flagged as synced; the pull merge marks it
    /// after deciding to keep it.
    #[must_use]
    pub fn into_local(self, uuid: Uuid) -> Playlist {
        Playlist {
            uuid,
            id: self.id,
            tracks: self.tracks,
            deleted: false,
            synced: false,
            updated: self.updated,
        }
    }
}

/// Body of `PUT /playlist/{id}`: tracks added to and removed from a
/// playlist the server already knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDelta {
    /// Locally added tracks awaiting server identifiers.
    pub added: Vec<Track>,
    /// Server identifiers of tracks tombstoned locally.
    pub removed: Vec<TrackId>,
}

impl PlaylistDelta {
    /// True when the delta carries no additions and no removals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Acknowledgment of `POST /playlist`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistResponse {
    /// The identifier the server assigned to the playlist.
    pub id: PlaylistId,
    /// Server timestamp of the create.
    #[serde(default)]
    pub updated: Option<Timestamp>,
    /// The server clock; a cursor candidate.
    #[serde(default)]
    pub time: Option<Timestamp>,
}

/// Acknowledgment of `PUT /playlist/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistResponse {
    /// One acknowledgment per accepted added track, keyed by client uuid.
    #[serde(default)]
    pub added: Vec<TrackAck>,
    /// The server clock; a cursor candidate.
    #[serde(default)]
    pub time: Option<Timestamp>,
}

/// Server identity assignment for one added playlist track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAck {
    /// The client key of the acknowledged track.
    pub uuid: Uuid,
    /// The identifier the server assigned.
    pub internal_id: TrackId,
}

/// Acknowledgment of `DELETE /playlist/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePlaylistResponse {
    /// The server clock; a cursor candidate.
    #[serde(default)]
    pub time: Option<Timestamp>,
}

/// Body of `PUT /star`: the batched star/unstar delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarDelta {
    /// Newly starred tracks, sorted by `order` before submission.
    pub added: Vec<StarredTrack>,
    /// Server identifiers of unstarred tracks.
    pub removed: Vec<TrackId>,
}

impl StarDelta {
    /// True when there is nothing to star or unstar.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Acknowledgment of `PUT /star`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarResponse {
    /// Identity assignments, positionally matched to the submitted
    /// order-sorted [`StarDelta::added`] list.
    #[serde(default)]
    pub added: Vec<StarAck>,
    /// The server clock; a cursor candidate.
    #[serde(default)]
    pub time: Option<Timestamp>,
}

/// Server identity assignment for one newly starred track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarAck {
    /// The identifier the server assigned.
    pub internal_id: TrackId,
}
