//! Pull reconciliation: server-authoritative merge of remote deltas.

use crate::error::{SyncError, SyncResult};
use crate::state::{SyncGuard, UserIdentity};
use crate::transport::SyncTransport;
use mixtape_protocol::{Playlist, StarredTrack, SyncEntity, Timestamp};
use mixtape_store::EntityStore;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Merges server-side changes since the cursor into local storage.
///
/// The server is trusted as authoritative for anything it reports: records
/// are overwritten wholesale, keyed by client `uuid`. Local changes not
/// yet pushed are protected only because they stay unsynced and the server
/// has not reported them; a true race between an unpushed local edit and
/// an incoming server edit resolves server-wins. This is accepted
/// behavior, not a defect.
pub struct PullReconciler {
    transport: Arc<dyn SyncTransport>,
    playlists: Arc<dyn EntityStore<Playlist>>,
    starred: Arc<dyn EntityStore<StarredTrack>>,
    guard: Arc<SyncGuard>,
}

impl PullReconciler {
    /// Creates a new pull reconciler.
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

    /// Fetches changes since `since` and merges them into local storage.
    ///
    /// Fails without a network call if a pull is already in flight or no
    /// identity is confirmed. Resolves with the server's reported clock,
    /// the next cursor candidate.
    pub async fn pull(
        &self,
        since: Option<Timestamp>,
        identity: Option<&UserIdentity>,
    ) -> SyncResult<Option<Timestamp>> {
        // released on every exit path, including errors below
        let _slot = self.guard.pull().try_begin()?;
        let identity = identity.ok_or(SyncError::NotAuthenticated)?;

        debug!(user = %identity.id, from = ?since, "pulling remote changes");
        let changes = self.transport.fetch_changes(since).await?;

        for remote in changes.playlists {
            if remote.deleted {
                if let Some(uuid) = remote.uuid {
                    self.playlists.delete(uuid).await?;
                }
                continue;
            }

            let uuid = match remote.uuid {
                Some(uuid) => uuid,
                None => {
                    // a well-behaved server echoes the client key; keep the
                    // record under a fresh one rather than dropping it
                    let fresh = Uuid::new_v4();
                    warn!(uuid = %fresh, "server reported a playlist without a uuid");
                    fresh
                }
            };

            let mut playlist = remote.into_local(uuid);
            playlist.mark_synced();
            self.playlists.upsert(playlist).await?;
        }

        let mut tracks = changes.starred.tracks;
        if !tracks.is_empty() {
            for track in &mut tracks {
                track.mark_synced();
            }
            self.starred.upsert_all(tracks).await?;
        }

        debug!(time = ?changes.time, "pull merged");
        Ok(changes.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, SentRequest};
    use mixtape_protocol::{ChangesResponse, PlaylistId, RemotePlaylist, StarredChanges};
    use mixtape_store::MemoryStore;

    struct Fixture {
        transport: Arc<MockTransport>,
        playlists: Arc<MemoryStore<Playlist>>,
        starred: Arc<MemoryStore<StarredTrack>>,
        reconciler: PullReconciler,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let playlists = Arc::new(MemoryStore::new());
        let starred = Arc::new(MemoryStore::new());
        let reconciler = PullReconciler::new(
            Arc::clone(&transport) as Arc<dyn SyncTransport>,
            Arc::clone(&playlists) as Arc<dyn EntityStore<Playlist>>,
            Arc::clone(&starred) as Arc<dyn EntityStore<StarredTrack>>,
            Arc::new(SyncGuard::new()),
        );
        Fixture {
            transport,
            playlists,
            starred,
            reconciler,
        }
    }

    fn identity() -> UserIdentity {
        UserIdentity::new("user-1")
    }

    fn remote_playlist(uuid: Uuid) -> RemotePlaylist {
        RemotePlaylist {
            uuid: Some(uuid),
            id: Some(PlaylistId::new("P1")),
            tracks: vec![],
            deleted: false,
            updated: Some(90),
        }
    }

    #[tokio::test]
    async fn pull_without_identity_issues_no_request() {
        let fx = fixture();
        let result = fx.reconciler.pull(None, None).await;
        assert!(matches!(result, Err(SyncError::NotAuthenticated)));
        assert_eq!(fx.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn pull_in_flight_issues_no_second_request() {
        let fx = fixture();
        let ident = identity();

        let _held = fx.reconciler.guard.pull().try_begin().unwrap();
        let result = fx.reconciler.pull(None, Some(&ident)).await;

        assert!(matches!(
            result,
            Err(SyncError::ConcurrencyConflict(crate::state::SyncDirection::Pull))
        ));
        assert_eq!(fx.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn pull_runs_again_after_success() {
        let fx = fixture();
        let ident = identity();
        for _ in 0..2 {
            fx.transport.queue_changes(ChangesResponse {
                playlists: vec![],
                starred: StarredChanges::default(),
                time: Some(10),
            });
        }

        fx.reconciler.pull(None, Some(&ident)).await.unwrap();
        // the in-flight slot was released, so a second round proceeds
        fx.reconciler.pull(Some(10), Some(&ident)).await.unwrap();
        assert_eq!(fx.transport.request_count(), 2);
    }

    #[tokio::test]
    async fn pull_runs_again_after_failure() {
        let fx = fixture();
        let ident = identity();

        // no queued response: the fetch itself fails
        let result = fx.reconciler.pull(None, Some(&ident)).await;
        assert!(matches!(result, Err(SyncError::Network(_))));

        fx.transport.queue_changes(ChangesResponse {
            playlists: vec![],
            starred: StarredChanges::default(),
            time: None,
        });
        fx.reconciler.pull(None, Some(&ident)).await.unwrap();
    }

    #[tokio::test]
    async fn full_snapshot_overwrites_unsynced_local_record() {
        let fx = fixture();
        let ident = identity();
        let uuid = Uuid::new_v4();

        // a local edit that never got pushed
        let mut local = Playlist::new(uuid);
        local.tracks.push(mixtape_protocol::Track::new(Uuid::new_v4(), 0));
        fx.playlists.upsert(local).await.unwrap();

        fx.transport.queue_changes(ChangesResponse {
            playlists: vec![remote_playlist(uuid)],
            starred: StarredChanges::default(),
            time: Some(200),
        });

        let time = fx.reconciler.pull(None, Some(&ident)).await.unwrap();
        assert_eq!(time, Some(200));
        assert_eq!(
            fx.transport.requests(),
            vec![SentRequest::FetchChanges { since: None }]
        );

        // server wins: the whole record was replaced and flagged synced
        let merged = fx.playlists.get(uuid).await.unwrap().unwrap();
        assert!(merged.synced);
        assert!(merged.tracks.is_empty());
        assert_eq!(merged.id, Some(PlaylistId::new("P1")));
    }

    #[tokio::test]
    async fn tombstoned_remote_playlist_is_deleted_locally() {
        let fx = fixture();
        let ident = identity();
        let uuid = Uuid::new_v4();
        fx.playlists.upsert(Playlist::new(uuid)).await.unwrap();

        let mut remote = remote_playlist(uuid);
        remote.deleted = true;
        fx.transport.queue_changes(ChangesResponse {
            playlists: vec![remote],
            starred: StarredChanges::default(),
            time: Some(300),
        });

        fx.reconciler.pull(Some(100), Some(&ident)).await.unwrap();
        assert!(fx.playlists.get(uuid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn playlist_without_uuid_is_kept_under_a_fresh_one() {
        let fx = fixture();
        let ident = identity();

        let mut remote = remote_playlist(Uuid::new_v4());
        remote.uuid = None;
        fx.transport.queue_changes(ChangesResponse {
            playlists: vec![remote],
            starred: StarredChanges::default(),
            time: Some(50),
        });

        fx.reconciler.pull(None, Some(&ident)).await.unwrap();
        assert_eq!(fx.playlists.len(), 1);
        assert!(fx.playlists.all()[0].synced);
    }

    #[tokio::test]
    async fn starred_tracks_are_upserted_synced() {
        let fx = fixture();
        let ident = identity();

        let track = StarredTrack::new(Uuid::new_v4(), 3);
        fx.transport.queue_changes(ChangesResponse {
            playlists: vec![],
            starred: StarredChanges {
                tracks: vec![track.clone()],
            },
            time: Some(70),
        });

        fx.reconciler.pull(None, Some(&ident)).await.unwrap();
        let stored = fx.starred.get(track.uuid).await.unwrap().unwrap();
        assert!(stored.synced);
        assert_eq!(stored.order, 3);
    }
}
