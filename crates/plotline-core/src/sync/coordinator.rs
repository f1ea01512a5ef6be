//! Session-aware sync state machine.
//!
//! The coordinator owns every decision about when local data is pulled,
//! pushed, adopted or wiped. The store, the remote and the auth surface
//! carry no policy of their own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::reconcile::{reconcile, Reconciliation};
use super::scheduler::{DebounceAction, DebounceScheduler};
use super::{PushOutcome, PushTrigger, SkipReason, SyncError, SyncRemote, SyncResult};
use crate::auth::{AuthSurface, AuthUser, Credentials};
use crate::config::SyncSettings;
use crate::state::{SyncPhase, SyncReport, SyncStatus};
use crate::store::{ChangeKind, ScratchStore, SnapshotStore};

#[derive(Debug, Clone)]
struct SessionState {
    phase: SyncPhase,
    user: Option<AuthUser>,
    /// Bumped on every auth transition; async results from an older epoch are dropped.
    epoch: u64,
    /// Set once the session's first pull has been applied.
    reconciled: bool,
    last_pull: Option<Instant>,
    last_pull_at: Option<DateTime<Utc>>,
    last_push_at: Option<DateTime<Utc>>,
    consecutive_failures: u32,
}

impl SessionState {
    const fn new() -> Self {
        Self {
            phase: SyncPhase::Anonymous,
            user: None,
            epoch: 0,
            reconciled: false,
            last_pull: None,
            last_pull_at: None,
            last_push_at: None,
            consecutive_failures: 0,
        }
    }

    fn within_guard_window(&self, settings: &SyncSettings) -> bool {
        self.last_pull
            .is_some_and(|pulled| pulled.elapsed() < settings.guard_window)
    }

    fn reset_session(&mut self, phase: SyncPhase) {
        self.phase = phase;
        self.user = None;
        self.reconciled = false;
        self.last_pull = None;
        self.last_pull_at = None;
        self.last_push_at = None;
        self.consecutive_failures = 0;
    }
}

/// What `suspend_for_auth` parked, so a rejected auth call can put it back.
struct SuspendedSession {
    state: SessionState,
    status: SyncStatus,
    /// Epoch of the `Authenticating` phase the auth call runs under.
    epoch: u64,
    debounce_pending: bool,
}

struct Inner {
    store: Arc<dyn SnapshotStore>,
    remote: Arc<dyn SyncRemote>,
    auth: Arc<dyn AuthSurface>,
    scratch: Arc<dyn ScratchStore>,
    settings: SyncSettings,
    state: Mutex<SessionState>,
    push_lane: tokio::sync::Mutex<()>,
    scheduler: DebounceScheduler,
    status: watch::Sender<SyncStatus>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Cloneable handle to the sync state machine.
///
/// Background timers only hold weak references, so dropping the last handle
/// stops them.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        remote: Arc<dyn SyncRemote>,
        auth: Arc<dyn AuthSurface>,
        scratch: Arc<dyn ScratchStore>,
        settings: SyncSettings,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::Offline);
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let action: DebounceAction = Arc::new(move |trigger| {
                let weak = weak.clone();
                Box::pin(async move {
                    match weak.upgrade() {
                        Some(inner) => inner.persist(trigger).await,
                        None => PushOutcome::Skipped(SkipReason::ShuttingDown),
                    }
                })
            });

            Inner {
                store,
                remote,
                auth,
                scratch,
                settings,
                state: Mutex::new(SessionState::new()),
                push_lane: tokio::sync::Mutex::new(()),
                scheduler: DebounceScheduler::new(settings.debounce, action),
                status,
                tasks: Mutex::new(Vec::new()),
            }
        });

        Self { inner }
    }

    /// Restore the previous session (if any) and reconcile with the server.
    ///
    /// Without a usable session the coordinator runs anonymously and local
    /// scratch data is loaded into an empty store. A failed pull leaves the
    /// store untouched and is returned to the caller.
    pub async fn start(&self) -> SyncResult<()> {
        self.inner.spawn_background();
        {
            let mut state = self.inner.state();
            state.epoch = state.epoch.wrapping_add(1);
            state.phase = SyncPhase::Authenticating;
        }
        self.inner.publish(SyncStatus::Syncing);

        match self.inner.auth.current_user().await {
            Ok(Some(user)) => {
                tracing::info!(user = %user.label(), "Restored session");
                let epoch = self.inner.begin_session(user);
                self.inner.pull_and_reconcile(epoch).await
            }
            Ok(None) => {
                tracing::info!("No session found; running offline");
                self.inner.enter_anonymous();
                Ok(())
            }
            Err(error) => {
                tracing::warn!("Failed to restore session, running offline: {}", error);
                self.inner.enter_anonymous();
                Ok(())
            }
        }
    }

    /// Sign in and adopt that account's data.
    ///
    /// Coming from anonymous mode, local data is kept for reconciliation.
    /// Switching accounts clears local data once the new login succeeds. No
    /// push runs while the auth call is in flight, and an auth failure puts
    /// the previous session back.
    pub async fn login(&self, credentials: &Credentials) -> SyncResult<AuthUser> {
        credentials.validate()?;
        let suspended = self.inner.suspend_for_auth().await;
        let user = match self.inner.auth.login(credentials).await {
            Ok(user) => user,
            Err(error) => {
                self.inner.resume_after_failed_auth(suspended);
                return Err(error.into());
            }
        };
        tracing::info!(user = %user.label(), "Signed in");

        if suspended.state.phase.is_authenticated() {
            self.inner.discard_previous_account();
        }
        let epoch = self.inner.begin_session(user.clone());
        self.inner.pull_and_reconcile(epoch).await?;
        Ok(user)
    }

    /// Create an account; any local data is uploaded to it right away.
    ///
    /// A new account has nothing on the server, so there is no pull and no
    /// guard window. Whatever the store holds when register is called is
    /// what gets uploaded, also when another account was signed in.
    /// Validation failures come back unchanged.
    pub async fn register(&self, credentials: &Credentials) -> SyncResult<AuthUser> {
        credentials.validate_for_registration()?;
        let suspended = self.inner.suspend_for_auth().await;
        let user = match self.inner.auth.register(credentials).await {
            Ok(user) => user,
            Err(error) => {
                self.inner.resume_after_failed_auth(suspended);
                return Err(error.into());
            }
        };
        tracing::info!(user = %user.label(), "Registered account");

        let epoch = self.inner.begin_session(user.clone());

        let adoption = if self.inner.store.is_empty() {
            None
        } else {
            let _lane = self.inner.push_lane.lock().await;
            tracing::info!(trigger = %PushTrigger::Adoption, "Uploading local data to new account");
            Some(self.inner.push_locked(PushTrigger::Adoption, epoch).await)
        };

        {
            let mut state = self.inner.state();
            if state.epoch != epoch {
                return Err(SyncError::Superseded);
            }
            state.phase = SyncPhase::Idle;
            state.reconciled = true;
        }
        self.inner.clear_scratch();
        self.inner.publish(if adoption == Some(PushOutcome::Failed) {
            SyncStatus::Degraded
        } else {
            SyncStatus::Synced
        });
        Ok(user)
    }

    /// Push the latest state one last time, end the session and wipe local data.
    ///
    /// Waits for an in-flight push first. A failing auth logout is logged and
    /// the local teardown still happens.
    pub async fn logout(&self) -> SyncResult<()> {
        let (epoch, reconciled) = {
            let mut state = self.inner.state();
            if !state.phase.is_authenticated() {
                return Err(SyncError::NotAuthenticated);
            }
            state.phase = SyncPhase::LoggingOut;
            state.epoch = state.epoch.wrapping_add(1);
            (state.epoch, state.reconciled)
        };
        self.inner.scheduler.cancel();
        self.inner.publish(SyncStatus::Syncing);

        {
            let _lane = self.inner.push_lane.lock().await;
            if reconciled {
                let outcome = self.inner.push_locked(PushTrigger::Logout, epoch).await;
                if outcome == PushOutcome::Failed {
                    tracing::warn!("Final push before logout failed; unsynced changes are discarded");
                }
            } else {
                tracing::warn!("Session never reconciled; skipping final push");
            }
        }

        if let Err(error) = self.inner.auth.logout().await {
            tracing::warn!("Auth logout failed, clearing local session anyway: {}", error);
        }

        self.inner.store.clear_all();
        self.inner.clear_scratch();
        self.inner.state().reset_session(SyncPhase::Anonymous);
        self.inner.publish(SyncStatus::Offline);
        tracing::info!("Logged out");
        Ok(())
    }

    /// Guarded push routine shared by the debounce and periodic timers.
    pub async fn push_if_due(&self, trigger: PushTrigger) -> PushOutcome {
        self.inner.push_if_due(trigger).await
    }

    /// One iteration of the background timer: retry the pull while the
    /// session is unreconciled, otherwise push.
    pub async fn periodic_tick(&self) {
        self.inner.periodic_tick().await;
    }

    /// Persist pending changes now instead of waiting for the debounce.
    pub async fn flush(&self) -> PushOutcome {
        self.inner.scheduler.fire_now(PushTrigger::Manual).await
    }

    /// Best-effort upload while the process is exiting. Never blocks.
    pub fn flush_on_exit(&self) -> PushOutcome {
        self.inner.scheduler.cancel();
        if self.inner.state().phase == SyncPhase::Anonymous {
            return self.inner.save_scratch();
        }
        if let Err(reason) = self.inner.check_push(true) {
            tracing::debug!(reason = ?reason, "Exit flush skipped");
            return PushOutcome::Skipped(reason);
        }
        self.inner.remote.send_beacon(self.inner.store.export_snapshot());
        PushOutcome::Beaconed
    }

    /// Stop timers and the store watcher. `start` spawns them again.
    pub fn shutdown(&self) {
        self.inner.scheduler.cancel();
        self.inner.abort_background();
    }

    pub fn status(&self) -> SyncStatus {
        *self.inner.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.state().phase
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.inner.state().user.clone()
    }

    pub fn is_debounce_armed(&self) -> bool {
        self.inner.scheduler.is_armed()
    }

    pub fn report(&self) -> SyncReport {
        let status = self.status();
        let state = self.inner.state();
        SyncReport {
            phase: state.phase,
            status,
            user: state.user.clone(),
            reconciled: state.reconciled,
            last_pull_at: state.last_pull_at,
            last_push_at: state.last_push_at,
            consecutive_failures: state.consecutive_failures,
        }
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }

    fn spawn_background(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if !tasks.is_empty() {
            return;
        }
        tasks.push(spawn_store_watcher(
            Arc::downgrade(self),
            self.store.subscribe(),
        ));
        tasks.push(spawn_periodic(
            Arc::downgrade(self),
            self.settings.periodic_interval,
        ));
    }

    fn abort_background(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    fn on_local_mutation(&self) {
        if self.state().phase != SyncPhase::LoggingOut {
            self.scheduler.arm();
        }
    }

    /// Start a new authenticated session epoch for `user`.
    fn begin_session(&self, user: AuthUser) -> u64 {
        self.store.set_current_user(Some(user.clone()));
        let mut state = self.state();
        state.reset_session(SyncPhase::Authenticating);
        state.user = Some(user);
        state.epoch = state.epoch.wrapping_add(1);
        state.epoch
    }

    /// Drop the signed-in account's local data before another account takes over.
    fn discard_previous_account(&self) {
        tracing::info!("Switching accounts; clearing local data");
        self.scheduler.cancel();
        self.store.clear_all();
    }

    /// Move to `Authenticating` under a fresh epoch before an auth call.
    ///
    /// Timer pushes see a non-authenticated phase and skip, and results of
    /// the previous epoch are discarded. An upload already in flight is
    /// waited for so it cannot overlap the token swap.
    async fn suspend_for_auth(&self) -> SuspendedSession {
        let (state, epoch) = {
            let mut state = self.state();
            let previous = state.clone();
            state.epoch = state.epoch.wrapping_add(1);
            state.phase = SyncPhase::Authenticating;
            (previous, state.epoch)
        };
        let status = *self.status.borrow();
        let debounce_pending = self.scheduler.cancel();
        self.publish(SyncStatus::Syncing);
        drop(self.push_lane.lock().await);

        SuspendedSession {
            state,
            status,
            epoch,
            debounce_pending,
        }
    }

    /// Restore the session parked by `suspend_for_auth` under a new epoch.
    fn resume_after_failed_auth(&self, suspended: SuspendedSession) {
        {
            let mut state = self.state();
            if state.epoch != suspended.epoch || state.phase != SyncPhase::Authenticating {
                return;
            }
            let epoch = state.epoch.wrapping_add(1);
            *state = SessionState {
                epoch,
                ..suspended.state
            };
        }
        self.publish(suspended.status);
        if suspended.debounce_pending {
            self.scheduler.arm();
        }
    }

    fn enter_anonymous(&self) {
        self.state().reset_session(SyncPhase::Anonymous);
        self.store.set_current_user(None);
        self.publish(SyncStatus::Offline);

        if !self.store.is_empty() {
            return;
        }
        match self.scratch.load() {
            Ok(Some(snapshot)) if !snapshot.is_empty() => {
                tracing::info!(
                    entities = snapshot.counts().total(),
                    "Restored offline scratch data"
                );
                self.store.load_snapshot(snapshot);
            }
            Ok(_) => {}
            Err(error) => tracing::warn!("Failed to load offline scratch data: {}", error),
        }
    }

    fn clear_scratch(&self) {
        if let Err(error) = self.scratch.clear() {
            tracing::warn!("Failed to clear offline scratch data: {}", error);
        }
    }

    fn save_scratch(&self) -> PushOutcome {
        match self.scratch.save(&self.store.export_snapshot()) {
            Ok(()) => {
                tracing::debug!("Saved offline scratch data");
                PushOutcome::SavedToScratch
            }
            Err(error) => {
                tracing::warn!("Failed to save offline scratch data: {}", error);
                PushOutcome::Failed
            }
        }
    }

    fn is_current(&self, epoch: u64, phase: SyncPhase) -> bool {
        let state = self.state();
        state.epoch == epoch && state.phase == phase
    }

    /// Fetch the server copy and apply the first-pull policy.
    async fn pull_and_reconcile(&self, epoch: u64) -> SyncResult<()> {
        {
            let mut state = self.state();
            if state.epoch != epoch {
                return Err(SyncError::Superseded);
            }
            state.phase = SyncPhase::Pulling;
        }
        self.publish(SyncStatus::Syncing);

        let server = match self.remote.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                let mut state = self.state();
                if state.epoch == epoch && state.phase == SyncPhase::Pulling {
                    state.phase = SyncPhase::Idle;
                    state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                    drop(state);
                    self.publish(SyncStatus::Degraded);
                    tracing::error!("Pull failed, local data left untouched: {}", error);
                }
                return Err(error);
            }
        };

        if !self.is_current(epoch, SyncPhase::Pulling) {
            tracing::debug!("Discarding pull result from a previous session");
            return Err(SyncError::Superseded);
        }

        let local = self.store.export_snapshot();
        let mut status = SyncStatus::Synced;
        match reconcile(&server, &local) {
            Reconciliation::AdoptServer => {
                tracing::info!(
                    entities = server.counts().total(),
                    "Adopting server snapshot"
                );
                self.store.load_snapshot(server);
            }
            Reconciliation::PushLocal => {
                let _lane = self.push_lane.lock().await;
                if !self.is_current(epoch, SyncPhase::Pulling) {
                    return Err(SyncError::Superseded);
                }
                tracing::info!(
                    trigger = %PushTrigger::Adoption,
                    entities = local.counts().total(),
                    "Server copy is empty; uploading local data"
                );
                if self.push_locked(PushTrigger::Adoption, epoch).await == PushOutcome::Failed {
                    status = SyncStatus::Degraded;
                }
            }
        }

        {
            let mut state = self.state();
            if state.epoch != epoch || state.phase != SyncPhase::Pulling {
                return Err(SyncError::Superseded);
            }
            state.phase = SyncPhase::Idle;
            state.reconciled = true;
            state.last_pull = Some(Instant::now());
            state.last_pull_at = Some(Utc::now());
            if status == SyncStatus::Synced {
                state.consecutive_failures = 0;
            }
        }
        self.clear_scratch();
        self.publish(status);
        Ok(())
    }

    /// Decide whether a push may run right now. Returns the session epoch.
    fn check_push(&self, respect_guard_window: bool) -> Result<u64, SkipReason> {
        let state = self.state();
        if !state.phase.is_authenticated() {
            return Err(SkipReason::NotAuthenticated);
        }
        if !state.reconciled {
            return Err(SkipReason::Unreconciled);
        }
        if respect_guard_window && state.within_guard_window(&self.settings) {
            return Err(SkipReason::GuardWindow);
        }
        Ok(state.epoch)
    }

    async fn persist(&self, trigger: PushTrigger) -> PushOutcome {
        let phase = self.state().phase;
        match phase {
            SyncPhase::Anonymous => self.save_scratch(),
            SyncPhase::Authenticating | SyncPhase::LoggingOut => {
                PushOutcome::Skipped(SkipReason::NotAuthenticated)
            }
            SyncPhase::Pulling | SyncPhase::Idle | SyncPhase::Pushing => {
                self.push_if_due(trigger).await
            }
        }
    }

    async fn push_if_due(&self, trigger: PushTrigger) -> PushOutcome {
        let respect_guard = trigger.respects_guard_window();
        if let Err(reason) = self.check_push(respect_guard) {
            tracing::debug!(trigger = %trigger, reason = ?reason, "Push skipped");
            return PushOutcome::Skipped(reason);
        }

        let _lane = if trigger.waits_for_lane() {
            self.push_lane.lock().await
        } else if let Ok(lane) = self.push_lane.try_lock() {
            lane
        } else {
            tracing::debug!(trigger = %trigger, "Push already in flight; dropping request");
            return PushOutcome::Skipped(SkipReason::InFlight);
        };

        // The session may have changed while waiting for the lane.
        let epoch = match self.check_push(respect_guard) {
            Ok(epoch) => epoch,
            Err(reason) => {
                tracing::debug!(trigger = %trigger, reason = ?reason, "Push skipped");
                return PushOutcome::Skipped(reason);
            }
        };
        self.push_locked(trigger, epoch).await
    }

    /// Upload the current store contents. Caller holds the push lane.
    async fn push_locked(&self, trigger: PushTrigger, epoch: u64) -> PushOutcome {
        {
            let mut state = self.state();
            if state.epoch == epoch && state.phase == SyncPhase::Idle {
                state.phase = SyncPhase::Pushing;
            }
        }
        self.publish(SyncStatus::Syncing);

        let snapshot = self.store.export_snapshot();
        let result = self.remote.save_snapshot(&snapshot).await;

        let mut state = self.state();
        let current = state.epoch == epoch;
        if current && state.phase == SyncPhase::Pushing {
            state.phase = SyncPhase::Idle;
        }
        match result {
            Ok(()) => {
                if current {
                    state.last_push_at = Some(Utc::now());
                    state.consecutive_failures = 0;
                    drop(state);
                    self.publish(SyncStatus::Synced);
                }
                tracing::debug!(
                    trigger = %trigger,
                    entities = snapshot.counts().total(),
                    "Pushed snapshot"
                );
                PushOutcome::Pushed
            }
            Err(error) => {
                if current {
                    state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                    drop(state);
                    self.publish(SyncStatus::Degraded);
                }
                tracing::error!(trigger = %trigger, "Push failed: {}", error);
                PushOutcome::Failed
            }
        }
    }

    async fn periodic_tick(&self) {
        let (phase, reconciled, epoch) = {
            let state = self.state();
            (state.phase, state.reconciled, state.epoch)
        };
        if phase == SyncPhase::Idle && !reconciled {
            tracing::debug!("Retrying pull for unreconciled session");
            if let Err(error) = self.pull_and_reconcile(epoch).await {
                tracing::debug!("Pull retry failed: {}", error);
            }
            return;
        }
        if phase.is_authenticated() {
            self.push_if_due(PushTrigger::Periodic).await;
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_background();
    }
}

fn spawn_store_watcher(
    inner: Weak<Inner>,
    mut changes: broadcast::Receiver<crate::store::StoreChange>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let mutated = match changes.recv().await {
                Ok(change) => change.kind == ChangeKind::Mutation,
                // Missed notifications may have included mutations.
                Err(broadcast::error::RecvError::Lagged(_)) => true,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let Some(inner) = inner.upgrade() else {
                break;
            };
            if mutated {
                inner.on_local_mutation();
            }
        }
    })
}

fn spawn_periodic(inner: Weak<Inner>, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.periodic_tick().await;
        }
    })
}
