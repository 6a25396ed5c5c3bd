//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use mixtape_protocol::{
    ChangesResponse, CreatePlaylistResponse, DeletePlaylistResponse, Playlist, PlaylistDelta,
    PlaylistId, StarDelta, StarResponse, Timestamp, UpdatePlaylistResponse,
};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A sync transport handles network communication with the remote store.
///
/// One method per endpoint, with typed responses. This trait abstracts the
/// network layer, allowing for different implementations (HTTP, mock for
/// testing, in-memory loopback).
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Fetches changes since the given cursor; a full snapshot if absent.
    async fn fetch_changes(&self, since: Option<Timestamp>) -> SyncResult<ChangesResponse>;

    /// Submits a brand new playlist.
    async fn create_playlist(&self, playlist: &Playlist) -> SyncResult<CreatePlaylistResponse>;

    /// Submits track additions and removals for a known playlist.
    async fn update_playlist(
        &self,
        id: &PlaylistId,
        delta: &PlaylistDelta,
    ) -> SyncResult<UpdatePlaylistResponse>;

    /// Deletes a known playlist.
    async fn delete_playlist(&self, id: &PlaylistId) -> SyncResult<DeletePlaylistResponse>;

    /// Submits the batched star/unstar delta.
    async fn update_starred(&self, delta: &StarDelta) -> SyncResult<StarResponse>;
}

/// A request captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum SentRequest {
    /// `fetch_changes` was called.
    FetchChanges {
        /// The cursor the fetch was bounded by.
        since: Option<Timestamp>,
    },
    /// `create_playlist` was called with this record.
    CreatePlaylist(Playlist),
    /// `update_playlist` was called.
    UpdatePlaylist {
        /// Target playlist.
        id: PlaylistId,
        /// Submitted delta.
        delta: PlaylistDelta,
    },
    /// `delete_playlist` was called.
    DeletePlaylist {
        /// Target playlist.
        id: PlaylistId,
    },
    /// `update_starred` was called with this delta.
    UpdateStarred(StarDelta),
}

/// A mock transport for testing.
///
/// Records every outbound request and replays queued typed responses.
/// A call with no queued response fails like a dropped connection, which
/// is also how tests inject transport failures.
#[derive(Debug, Default)]
pub struct MockTransport {
    changes: Mutex<VecDeque<ChangesResponse>>,
    creates: Mutex<VecDeque<CreatePlaylistResponse>>,
    updates: Mutex<VecDeque<UpdatePlaylistResponse>>,
    deletes: Mutex<VecDeque<DeletePlaylistResponse>>,
    stars: Mutex<VecDeque<StarResponse>>,
    requests: Mutex<Vec<SentRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next `fetch_changes` call.
    pub fn queue_changes(&self, response: ChangesResponse) {
        self.changes.lock().push_back(response);
    }

    /// Queues a response for the next `create_playlist` call.
    pub fn queue_create(&self, response: CreatePlaylistResponse) {
        self.creates.lock().push_back(response);
    }

    /// Queues a response for the next `update_playlist` call.
    pub fn queue_update(&self, response: UpdatePlaylistResponse) {
        self.updates.lock().push_back(response);
    }

    /// Queues a response for the next `delete_playlist` call.
    pub fn queue_delete(&self, response: DeletePlaylistResponse) {
        self.deletes.lock().push_back(response);
    }

    /// Queues a response for the next `update_starred` call.
    pub fn queue_star(&self, response: StarResponse) {
        self.stars.lock().push_back(response);
    }

    /// Returns every request sent so far, in dispatch order.
    #[must_use]
    pub fn requests(&self) -> Vec<SentRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn record(&self, request: SentRequest) {
        self.requests.lock().push(request);
    }

    fn take<T>(queue: &Mutex<VecDeque<T>>, endpoint: &str) -> SyncResult<T> {
        queue
            .lock()
            .pop_front()
            .ok_or_else(|| SyncError::Network(format!("no queued response for {endpoint}")))
    }
}

#[async_trait]
impl SyncTransport for MockTransport {
    async fn fetch_changes(&self, since: Option<Timestamp>) -> SyncResult<ChangesResponse> {
        self.record(SentRequest::FetchChanges { since });
        Self::take(&self.changes, "fetch_changes")
    }

    async fn create_playlist(&self, playlist: &Playlist) -> SyncResult<CreatePlaylistResponse> {
        self.record(SentRequest::CreatePlaylist(playlist.clone()));
        Self::take(&self.creates, "create_playlist")
    }

    async fn update_playlist(
        &self,
        id: &PlaylistId,
        delta: &PlaylistDelta,
    ) -> SyncResult<UpdatePlaylistResponse> {
        self.record(SentRequest::UpdatePlaylist {
            id: id.clone(),
            delta: delta.clone(),
        });
        Self::take(&self.updates, "update_playlist")
    }

    async fn delete_playlist(&self, id: &PlaylistId) -> SyncResult<DeletePlaylistResponse> {
        self.record(SentRequest::DeletePlaylist { id: id.clone() });
        Self::take(&self.deletes, "delete_playlist")
    }

    async fn update_starred(&self, delta: &StarDelta) -> SyncResult<StarResponse> {
        self.record(SentRequest::UpdateStarred(delta.clone()));
        Self::take(&self.stars, "update_starred")
    }
}
