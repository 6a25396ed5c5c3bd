//! Push reconciliation: classify local changes, fan out, commit acks.

use crate::error::{SyncError, SyncResult};
use crate::state::{SyncGuard, UserIdentity};
use crate::transport::SyncTransport;
use futures::future;
use mixtape_protocol::{
    CreatePlaylistResponse, DeletePlaylistResponse, Playlist, PlaylistDelta, PlaylistId,
    StarDelta, StarResponse, StarredTrack, SyncEntity, Timestamp, UpdatePlaylistResponse,
};
use mixtape_store::EntityStore;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// One outbound playlist operation.
///
/// Each operation owns the record it was derived from, so its
/// acknowledgment is paired with it by construction rather than by the
/// position of a response in an array.
enum PlaylistOp {
    /// The server has never seen this playlist; submit the whole record.
    Create { playlist: Playlist },
    /// The server knows this playlist; submit the track delta.
    Update {
        playlist: Playlist,
        id: PlaylistId,
        delta: PlaylistDelta,
    },
    /// The playlist is tombstoned and the server knows it; delete remotely.
    Delete { uuid: Uuid, id: PlaylistId },
}

/// A playlist operation joined with its acknowledgment, ready to commit.
enum PlaylistOutcome {
    Created {
        playlist: Playlist,
        ack: CreatePlaylistResponse,
    },
    Updated {
        playlist: Playlist,
        ack: UpdatePlaylistResponse,
    },
    Deleted {
        uuid: Uuid,
        ack: DeletePlaylistResponse,
    },
}

/// Uploads local unsynced mutations and reconciles server identifiers
/// back into local state.
///
/// The phase is all-or-nothing: every classified operation is dispatched
/// concurrently, and a single failure fails the whole phase before any
/// acknowledgment is committed, leaving every sync flag untouched for the
/// next cycle.
pub struct PushReconciler {
    transport: Arc<dyn SyncTransport>,
    playlists: Arc<dyn EntityStore<Playlist>>,
    starred: Arc<dyn EntityStore<StarredTrack>>,
    guard: Arc<SyncGuard>,
}

impl PushReconciler {
    /// Creates a new push reconciler.
    pub fn new(
        transport: Arc<dyn SyncTransport>,
        playlists: Arc<dyn EntityStore<Playlist>>,
        starred: Arc<dyn EntityStore<StarredTrack>>,
        guard: Arc<SyncGuard>,
    ) -> Self {
        Self {
            transport,
            playlists,
            starred,
            guard,
        }
    }

    /// Pushes every unsynced local mutation.
    ///
    /// Resolves with the latest server clock reported across the
    /// acknowledgments it processed, falling back to `candidate` when the
    /// push touched nothing.
    pub async fn push(
        &self,
        candidate: Option<Timestamp>,
        identity: Option<&UserIdentity>,
    ) -> SyncResult<Option<Timestamp>> {
        // released on every exit path, including errors below
        let _slot = self.guard.push().try_begin()?;
        let identity = identity.ok_or(SyncError::NotAuthenticated)?;

        debug!(user = %identity.id, "pushing local changes");

        let (playlists, starred_tracks) =
            tokio::try_join!(self.playlists.unsynced(), self.starred.unsynced())?;

        let ops = self.classify_playlists(playlists).await?;
        let (starred, unstarred) = self.classify_starred(starred_tracks).await?;

        let star_delta = if starred.is_empty() && unstarred.is_empty() {
            None
        } else {
            Some(StarDelta {
                added: starred.clone(),
                removed: unstarred
                    .iter()
                    .filter_map(|t| t.internal_id.clone())
                    .collect(),
            })
        };

        let total = ops.len() + usize::from(star_delta.is_some());
        if total == 0 {
            debug!("nothing to push");
            return Ok(candidate);
        }

        // fan out every operation; join with an all-or-nothing barrier
        let (playlist_results, star_result) = tokio::join!(
            future::join_all(ops.into_iter().map(|op| self.submit(op))),
            async {
                match &star_delta {
                    Some(delta) => Some(self.transport.update_starred(delta).await),
                    None => None,
                }
            }
        );

        let failed = playlist_results.iter().filter(|r| r.is_err()).count()
            + star_result
                .as_ref()
                .map_or(0, |r| usize::from(r.is_err()));
        if failed > 0 {
            for err in playlist_results.iter().filter_map(|r| r.as_ref().err()) {
                warn!(error = %err, "playlist request failed");
            }
            if let Some(Err(err)) = &star_result {
                warn!(error = %err, "star request failed");
            }
            return Err(SyncError::PartialFailure { failed, total });
        }

        let mut cursor = candidate;
        for result in playlist_results {
            let reported = self.commit_playlist(result?).await?;
            cursor = cursor.max(reported);
        }
        if let Some(result) = star_result {
            let reported = self.commit_starred(starred, &unstarred, result?).await?;
            cursor = cursor.max(reported);
        }

        debug!(cursor = ?cursor, "push committed");
        Ok(cursor)
    }

    /// Classifies each unsynced playlist into exactly one operation,
    /// purging tombstones the server never knew about.
    async fn classify_playlists(&self, playlists: Vec<Playlist>) -> SyncResult<Vec<PlaylistOp>> {
        let mut ops = Vec::with_capacity(playlists.len());
        for playlist in playlists {
            if playlist.deleted && !playlist.has_remote_identity() {
                // never reached the server; purely local cleanup
                debug!(uuid = %playlist.uuid, "purging local-only playlist tombstone");
                self.playlists.delete(playlist.uuid).await?;
                continue;
            }
            ops.push(Self::classify(playlist));
        }
        Ok(ops)
    }

    fn classify(playlist: Playlist) -> PlaylistOp {
        match (playlist.id.clone(), playlist.deleted) {
            (None, _) => PlaylistOp::Create { playlist },
            (Some(id), false) => {
                let added = playlist
                    .tracks
                    .iter()
                    .filter(|t| t.internal_id.is_none() && !t.deleted)
                    .cloned()
                    .collect();
                let removed = playlist
                    .tracks
                    .iter()
                    .filter(|t| t.deleted)
                    .filter_map(|t| t.internal_id.clone())
                    .collect();
                PlaylistOp::Update {
                    playlist,
                    id,
                    delta: PlaylistDelta { added, removed },
                }
            }
            (Some(id), true) => PlaylistOp::Delete {
                uuid: playlist.uuid,
                id,
            },
        }
    }

    /// Splits unsynced starred tracks into stars and unstars, purging
    /// tombstones the server never knew about.
    ///
    /// The star list is sorted by `order` before submission; the server
    /// acknowledges it positionally in that order.
    async fn classify_starred(
        &self,
        tracks: Vec<StarredTrack>,
    ) -> SyncResult<(Vec<StarredTrack>, Vec<StarredTrack>)> {
        let mut starred = Vec::new();
        let mut unstarred = Vec::new();

        for track in tracks {
            match (track.has_remote_identity(), track.deleted) {
                (false, true) => {
                    debug!(uuid = %track.uuid, "purging local-only starred tombstone");
                    self.starred.delete(track.uuid).await?;
                }
                (false, false) => starred.push(track),
                (true, true) => unstarred.push(track),
                // no wire operation exists for editing an acked star;
                // the record stays unsynced for a later protocol revision
                (true, false) => {}
            }
        }

        starred.sort_by_key(|t| t.order);
        Ok((starred, unstarred))
    }

    async fn submit(&self, op: PlaylistOp) -> SyncResult<PlaylistOutcome> {
        match op {
            PlaylistOp::Create { playlist } => {
                let ack = self.transport.create_playlist(&playlist).await?;
                Ok(PlaylistOutcome::Created { playlist, ack })
            }
            PlaylistOp::Update {
                playlist,
                id,
                delta,
            } => {
                let ack = self.transport.update_playlist(&id, &delta).await?;
                Ok(PlaylistOutcome::Updated { playlist, ack })
            }
            PlaylistOp::Delete { uuid, id } => {
                let ack = self.transport.delete_playlist(&id).await?;
                Ok(PlaylistOutcome::Deleted { uuid, ack })
            }
        }
    }

    async fn commit_playlist(&self, outcome: PlaylistOutcome) -> SyncResult<Option<Timestamp>> {
        match outcome {
            PlaylistOutcome::Created { mut playlist, ack } => {
                playlist.id = Some(ack.id);
                playlist.updated = ack.updated;
                playlist.mark_synced();
                self.playlists.upsert(playlist).await?;
                Ok(ack.time)
            }
            PlaylistOutcome::Updated { mut playlist, ack } => {
                for track_ack in ack.added {
                    if let Some(track) = playlist
                        .tracks
                        .iter_mut()
                        .find(|t| t.uuid == track_ack.uuid)
                    {
                        track.internal_id = Some(track_ack.internal_id);
                    }
                }
                // acked removals are durable now; tombstones leave the record
                playlist.tracks.retain(|t| !t.deleted);
                playlist.mark_synced();
                self.playlists.upsert(playlist).await?;
                Ok(ack.time)
            }
            PlaylistOutcome::Deleted { uuid, ack } => {
                self.playlists.delete(uuid).await?;
                Ok(ack.time)
            }
        }
    }

    async fn commit_starred(
        &self,
        mut starred: Vec<StarredTrack>,
        unstarred: &[StarredTrack],
        ack: StarResponse,
    ) -> SyncResult<Option<Timestamp>> {
        for (track, star_ack) in starred.iter_mut().zip(ack.added) {
            track.internal_id = Some(star_ack.internal_id);
            track.mark_synced();
        }
        self.starred.upsert_all(starred).await?;

        let removed: Vec<Uuid> = unstarred.iter().map(|t| t.uuid).collect();
        self.starred.delete_all(&removed).await?;
        Ok(ack.time)
    }
}
