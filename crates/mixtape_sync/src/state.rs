//! Sync guard state machine and orchestration.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::pull::PullReconciler;
use crate::push::PushReconciler;
use crate::transport::SyncTransport;
use mixtape_protocol::{Playlist, StarredTrack, Timestamp};
use mixtape_store::{CursorStore, EntityStore};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Direction of a sync phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Server to local.
    Pull,
    /// Local to server.
    Push,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Pull => write!(f, "pull"),
            SyncDirection::Push => write!(f, "push"),
        }
    }
}

/// The state of one sync direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// No phase of this direction is running.
    Idle,
    /// A phase of this direction is running.
    InFlight,
}

/// Single-flight lock for one sync direction.
///
/// A direction moves `Idle -> InFlight` by acquiring a [`PhaseSlot`] and
/// back on every exit path when the slot drops, so no outcome can leave
/// the direction wedged. No timeout is modeled: a stalled request holds
/// the slot until the process restarts, blocking further attempts of the
/// same direction.
#[derive(Debug)]
pub struct PhaseLock {
    direction: SyncDirection,
    in_flight: AtomicBool,
}

impl PhaseLock {
    /// Creates an idle lock for the given direction.
    #[must_use]
    pub fn new(direction: SyncDirection) -> Self {
        Self {
            direction,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> PhaseState {
        if self.in_flight.load(Ordering::SeqCst) {
            PhaseState::InFlight
        } else {
            PhaseState::Idle
        }
    }

    /// Moves to `InFlight`, or fails if a phase is already running.
    pub fn try_begin(&self) -> SyncResult<PhaseSlot<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SyncError::ConcurrencyConflict(self.direction))?;
        Ok(PhaseSlot { lock: self })
    }
}

/// Possession of a running phase; dropping it returns the direction
/// to `Idle`.
#[derive(Debug)]
pub struct PhaseSlot<'a> {
    lock: &'a PhaseLock,
}

impl Drop for PhaseSlot<'_> {
    fn drop(&mut self) {
        self.lock.in_flight.store(false, Ordering::SeqCst);
    }
}

/// The process-wide pair of single-flight locks, one per direction.
#[derive(Debug)]
pub struct SyncGuard {
    pull: PhaseLock,
    push: PhaseLock,
}

impl SyncGuard {
    /// Creates a guard with both directions idle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pull: PhaseLock::new(SyncDirection::Pull),
            push: PhaseLock::new(SyncDirection::Push),
        }
    }

    /// The pull direction lock.
    #[must_use]
    pub fn pull(&self) -> &PhaseLock {
        &self.pull
    }

    /// The push direction lock.
    #[must_use]
    pub fn push(&self) -> &PhaseLock {
        &self.push
    }
}

impl Default for SyncGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// A confirmed user identity, as supplied by the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Opaque account identifier. Never empty for a confirmed identity.
    pub id: String,
}

impl UserIdentity {
    /// Creates an identity with the given account identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Events emitted toward the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A sync round started.
    Started,
    /// A sync round finished successfully; the cursor was advanced.
    Completed {
        /// The cursor stored for the next round, if the server reported one.
        cursor: Option<Timestamp>,
    },
}

/// Statistics about sync rounds.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Fully successful rounds completed.
    pub cycles_completed: u64,
    /// Cursor stored by the most recent successful round.
    pub last_cursor: Option<Timestamp>,
    /// The failure that terminated the most recent round, if it failed.
    pub last_error: Option<String>,
}

/// Sequences pull, push, and cursor advancement.
///
/// A round runs pull first; only if pull succeeds does push run with
/// pull's reported time as the cursor candidate; only if push succeeds is
/// the cursor advanced and completion emitted. A failed stage terminates
/// the round with no completion event and no cursor movement - the next
/// triggered round retries from the last durable cursor.
pub struct SyncOrchestrator {
    pull: PullReconciler,
    push: PushReconciler,
    guard: Arc<SyncGuard>,
    cursor: Arc<dyn CursorStore>,
    config: SyncConfig,
    identity: RwLock<Option<UserIdentity>>,
    events: RwLock<Option<mpsc::UnboundedSender<SyncEvent>>>,
    stats: RwLock<SyncStats>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        config: SyncConfig,
        transport: Arc<dyn SyncTransport>,
        playlists: Arc<dyn EntityStore<Playlist>>,
        starred: Arc<dyn EntityStore<StarredTrack>>,
        cursor: Arc<dyn CursorStore>,
    ) -> Self {
        let guard = Arc::new(SyncGuard::new());
        Self {
            pull: PullReconciler::new(
                Arc::clone(&transport),
                Arc::clone(&playlists),
                Arc::clone(&starred),
                Arc::clone(&guard),
            ),
            push: PushReconciler::new(transport, playlists, starred, Arc::clone(&guard)),
            guard,
            cursor,
            config,
            identity: RwLock::new(None),
            events: RwLock::new(None),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// The single-flight guard shared by both phases.
    #[must_use]
    pub fn guard(&self) -> &SyncGuard {
        &self.guard
    }

    /// Returns a snapshot of the sync statistics.
    #[must_use]
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the confirmed identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<UserIdentity> {
        self.identity.read().clone()
    }

    /// Routes emitted [`SyncEvent`]s to the given channel.
    pub fn set_event_channel(&self, sender: mpsc::UnboundedSender<SyncEvent>) {
        *self.events.write() = Some(sender);
    }

    /// Stores an identity without scheduling a sync.
    ///
    /// Used by session layers restoring a persisted identity; a fresh
    /// confirmation goes through [`SyncOrchestrator::confirm_identity`].
    pub fn set_identity(&self, identity: Option<UserIdentity>) {
        *self.identity.write() = identity;
    }

    /// Consumes an identity confirmation.
    ///
    /// A confirmation without an id is ignored. Otherwise the identity is
    /// stored and exactly one sync attempt is scheduled after the
    /// configured start delay, giving dependent subsystems time to settle.
    pub fn confirm_identity(self: &Arc<Self>, identity: UserIdentity) {
        if identity.id.is_empty() {
            warn!("ignoring identity confirmation without an id");
            return;
        }

        info!(user = %identity.id, "identity confirmed, scheduling sync");
        self.set_identity(Some(identity));

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(orchestrator.config.start_delay).await;
            // a failed round stays silent; the next trigger retries
            // from the last durable cursor
            let _ = orchestrator.sync().await;
        });
    }

    /// Runs one sync round: pull, then push, then cursor advancement.
    pub async fn sync(&self) -> SyncResult<Option<Timestamp>> {
        self.emit(SyncEvent::Started);

        let identity = self.identity();
        let since = self.cursor.get();

        let candidate = match self.pull.pull(since, identity.as_ref()).await {
            Ok(candidate) => candidate,
            Err(err) => {
                self.record_failure("pull", &err);
                return Err(err);
            }
        };

        let advanced = match self.push.push(candidate, identity.as_ref()).await {
            Ok(advanced) => advanced,
            Err(err) => {
                self.record_failure("push", &err);
                return Err(err);
            }
        };

        if let Err(err) = self.cursor.set(advanced) {
            let err = SyncError::from(err);
            self.record_failure("cursor", &err);
            return Err(err);
        }

        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.last_cursor = advanced.or(since);
            stats.last_error = None;
        }

        info!(cursor = ?advanced, "sync completed");
        self.emit(SyncEvent::Completed { cursor: advanced });
        Ok(advanced)
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(sender) = self.events.read().as_ref() {
            // a dropped receiver only means nobody is listening
            let _ = sender.send(event);
        }
    }

    fn record_failure(&self, stage: &str, err: &SyncError) {
        warn!(stage, error = %err, "sync round terminated");
        self.stats.write().last_error = Some(format!("{stage}: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use mixtape_protocol::{
        ChangesResponse, CreatePlaylistResponse, PlaylistId, StarredChanges,
    };
    use mixtape_store::{MemoryCursorStore, MemoryStore};
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn phase_slot_releases_on_drop() {
        let lock = PhaseLock::new(SyncDirection::Pull);
        assert_eq!(lock.state(), PhaseState::Idle);

        {
            let _slot = lock.try_begin().unwrap();
            assert_eq!(lock.state(), PhaseState::InFlight);
            assert!(lock.try_begin().is_err());
        }

        assert_eq!(lock.state(), PhaseState::Idle);
        assert!(lock.try_begin().is_ok());
    }

    #[test]
    fn guard_directions_are_independent() {
        let guard = SyncGuard::new();
        let _pull = guard.pull().try_begin().unwrap();
        // a running pull does not block push
        let _push = guard.push().try_begin().unwrap();
        assert!(guard.pull().try_begin().is_err());
    }

    struct Fixture {
        transport: Arc<MockTransport>,
        playlists: Arc<MemoryStore<Playlist>>,
        cursor: Arc<MemoryCursorStore>,
        orchestrator: Arc<SyncOrchestrator>,
    }

    fn fixture(config: SyncConfig) -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let playlists = Arc::new(MemoryStore::new());
        let starred: Arc<MemoryStore<StarredTrack>> = Arc::new(MemoryStore::new());
        let cursor = Arc::new(MemoryCursorStore::new());
        let orchestrator = Arc::new(SyncOrchestrator::new(
            config,
            Arc::clone(&transport) as Arc<dyn SyncTransport>,
            Arc::clone(&playlists) as Arc<dyn EntityStore<Playlist>>,
            starred as Arc<dyn EntityStore<StarredTrack>>,
            Arc::clone(&cursor) as Arc<dyn CursorStore>,
        ));
        Fixture {
            transport,
            playlists,
            cursor,
            orchestrator,
        }
    }

    fn confirmed(fx: &Fixture) {
        fx.orchestrator.set_identity(Some(UserIdentity::new("user-1")));
    }

    fn empty_changes(time: Option<Timestamp>) -> ChangesResponse {
        ChangesResponse {
            playlists: vec![],
            starred: StarredChanges::default(),
            time,
        }
    }

    #[tokio::test]
    async fn full_round_advances_cursor_and_emits_events() {
        let fx = fixture(SyncConfig::new());
        confirmed(&fx);

        let (tx, mut rx) = mpsc::unbounded_channel();
        fx.orchestrator.set_event_channel(tx);

        fx.playlists
            .upsert(Playlist::new(Uuid::new_v4()))
            .await
            .unwrap();

        fx.transport.queue_changes(empty_changes(Some(100)));
        fx.transport.queue_create(CreatePlaylistResponse {
            id: PlaylistId::new("P1"),
            updated: None,
            time: Some(500),
        });

        let advanced = fx.orchestrator.sync().await.unwrap();
        assert_eq!(advanced, Some(500));
        assert_eq!(fx.cursor.get(), Some(500));

        assert_eq!(rx.try_recv().unwrap(), SyncEvent::Started);
        assert_eq!(
            rx.try_recv().unwrap(),
            SyncEvent::Completed { cursor: Some(500) }
        );

        let stats = fx.orchestrator.stats();
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(stats.last_cursor, Some(500));
        assert!(stats.last_error.is_none());
    }

    #[tokio::test]
    async fn pull_failure_terminates_round_silently() {
        let fx = fixture(SyncConfig::new());
        confirmed(&fx);

        let (tx, mut rx) = mpsc::unbounded_channel();
        fx.orchestrator.set_event_channel(tx);

        // no queued changes response: pull fails
        let result = fx.orchestrator.sync().await;
        assert!(result.is_err());

        assert_eq!(fx.cursor.get(), None);
        assert_eq!(rx.try_recv().unwrap(), SyncEvent::Started);
        assert!(rx.try_recv().is_err());

        let stats = fx.orchestrator.stats();
        assert_eq!(stats.cycles_completed, 0);
        let last_error = stats.last_error.unwrap();
        assert!(last_error.starts_with("pull:"), "{last_error}");
    }

    #[tokio::test]
    async fn push_failure_leaves_cursor_at_last_durable_value() {
        let fx = fixture(SyncConfig::new());
        confirmed(&fx);
        fx.cursor.set(Some(100)).unwrap();

        fx.playlists
            .upsert(Playlist::new(Uuid::new_v4()))
            .await
            .unwrap();

        // pull succeeds with a newer candidate, push fails
        fx.transport.queue_changes(empty_changes(Some(250)));

        let result = fx.orchestrator.sync().await;
        assert!(result.is_err());
        assert_eq!(fx.cursor.get(), Some(100));

        let stats = fx.orchestrator.stats();
        assert!(stats.last_error.unwrap().starts_with("push:"));
    }

    #[tokio::test]
    async fn sync_without_identity_fails_before_any_request() {
        let fx = fixture(SyncConfig::new());
        let result = fx.orchestrator.sync().await;
        assert!(matches!(result, Err(SyncError::NotAuthenticated)));
        assert_eq!(fx.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn confirm_identity_without_id_is_ignored() {
        let fx = fixture(SyncConfig::new());
        fx.orchestrator.confirm_identity(UserIdentity::new(""));
        assert!(fx.orchestrator.identity().is_none());
    }

    #[tokio::test]
    async fn confirm_identity_schedules_one_round() {
        let fx = fixture(SyncConfig::new().with_start_delay(Duration::ZERO));
        fx.transport.queue_changes(empty_changes(Some(10)));

        fx.orchestrator
            .confirm_identity(UserIdentity::new("user-1"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = fx.orchestrator.stats();
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(fx.cursor.get(), Some(10));
    }
}
