use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::time::sleep;

use super::*;
use crate::auth::{AuthError, AuthResult, AuthSurface, AuthUser, Credentials};
use crate::config::SyncSettings;
use crate::models::{Chapter, Story};
use crate::state::{SyncPhase, SyncStatus};
use crate::store::{LocalStore, MemoryScratchStore, ScratchStore, SnapshotStore};

#[derive(Default)]
struct FakeRemote {
    server: Mutex<Snapshot>,
    pushes: Mutex<Vec<Snapshot>>,
    beacons: Mutex<Vec<Snapshot>>,
    fetch_calls: AtomicUsize,
    save_calls: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_save: AtomicBool,
    fetch_delay: Mutex<Duration>,
    save_delay: Mutex<Duration>,
}

impl FakeRemote {
    fn set_server(&self, snapshot: Snapshot) {
        *self.server.lock().unwrap() = snapshot;
    }

    fn server(&self) -> Snapshot {
        self.server.lock().unwrap().clone()
    }

    fn pushes(&self) -> Vec<Snapshot> {
        self.pushes.lock().unwrap().clone()
    }

    fn beacon_count(&self) -> usize {
        self.beacons.lock().unwrap().len()
    }

    fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn save_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncRemote for FakeRemote {
    async fn fetch_snapshot(&self) -> SyncResult<Snapshot> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::Network("connection refused".to_string()));
        }
        Ok(self.server())
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> SyncResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.save_delay.lock().unwrap();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(SyncError::Network("save failed with 502".to_string()));
        }
        self.set_server(snapshot.clone());
        self.pushes.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    fn send_beacon(&self, snapshot: Snapshot) {
        self.beacons.lock().unwrap().push(snapshot);
    }
}

#[derive(Default)]
struct FakeAuth {
    session: Mutex<Option<AuthUser>>,
    logout_calls: AtomicUsize,
    fail_logout: AtomicBool,
    login_delay: Mutex<Duration>,
}

fn user_for(email: &str) -> AuthUser {
    AuthUser {
        id: format!("id-{email}"),
        email: Some(email.to_string()),
    }
}

#[async_trait]
impl AuthSurface for FakeAuth {
    async fn current_user(&self) -> AuthResult<Option<AuthUser>> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn login(&self, credentials: &Credentials) -> AuthResult<AuthUser> {
        let delay = *self.login_delay.lock().unwrap();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        if credentials.password == "wrong-password" {
            return Err(AuthError::InvalidCredentials);
        }
        let user = user_for(&credentials.email);
        *self.session.lock().unwrap() = Some(user.clone());
        Ok(user)
    }

    async fn register(&self, credentials: &Credentials) -> AuthResult<AuthUser> {
        if credentials.email == "taken@example.com" {
            return Err(AuthError::Validation(
                "An account with this email already exists".to_string(),
            ));
        }
        let user = user_for(&credentials.email);
        *self.session.lock().unwrap() = Some(user.clone());
        Ok(user)
    }

    async fn logout(&self) -> AuthResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(AuthError::Api("logout endpoint unavailable (503)".to_string()));
        }
        Ok(())
    }
}

struct Harness {
    store: Arc<LocalStore>,
    remote: Arc<FakeRemote>,
    auth: Arc<FakeAuth>,
    scratch: Arc<MemoryScratchStore>,
    coordinator: SyncCoordinator,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(LocalStore::new());
        let remote = Arc::new(FakeRemote::default());
        let auth = Arc::new(FakeAuth::default());
        let scratch = Arc::new(MemoryScratchStore::default());
        let coordinator = SyncCoordinator::new(
            store.clone(),
            remote.clone(),
            auth.clone(),
            scratch.clone(),
            SyncSettings::default(),
        );
        Self {
            store,
            remote,
            auth,
            scratch,
            coordinator,
        }
    }

    fn signed_in(email: &str) -> Self {
        let harness = Self::new();
        *harness.auth.session.lock().unwrap() = Some(user_for(email));
        harness
    }

    fn story_titles(&self) -> Vec<String> {
        self.store
            .list::<Story>()
            .into_iter()
            .map(|story| story.title)
            .collect()
    }
}

fn credentials(email: &str) -> Credentials {
    Credentials::new(email, "correct horse")
}

fn server_with_stories(titles: &[&str]) -> Snapshot {
    Snapshot {
        stories: titles.iter().map(|title| Story::new(*title)).collect(),
        ..Snapshot::default()
    }
}

// Lets the store watcher observe mutations without crossing any timer.
async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn first_login_with_local_data_and_empty_server_pushes_local_copy() {
    let harness = Harness::new();
    harness.coordinator.start().await.unwrap();
    let draft = harness.store.add(Story::new("Draft"));

    harness
        .coordinator
        .login(&credentials("writer@example.com"))
        .await
        .unwrap();

    let pushes = harness.remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].stories, vec![draft.clone()]);
    assert_eq!(harness.store.list::<Story>(), vec![draft]);
    assert_eq!(harness.coordinator.phase(), SyncPhase::Idle);
    assert_eq!(harness.coordinator.status(), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn empty_local_adopts_server_snapshot_without_pushing() {
    let harness = Harness::signed_in("writer@example.com");
    let saga = Story::new("Saga");
    let server = Snapshot {
        chapters: vec![Chapter::new(saga.id.clone(), "Opening", 0)],
        stories: vec![saga],
        ..Snapshot::default()
    };
    harness.remote.set_server(server.clone());

    harness.coordinator.start().await.unwrap();

    assert_eq!(harness.store.export_snapshot(), server);
    assert!(harness.remote.pushes().is_empty());
    assert_eq!(
        harness.store.current_user(),
        Some(user_for("writer@example.com"))
    );
}

#[tokio::test(start_paused = true)]
async fn server_data_replaces_local_data_on_login() {
    let harness = Harness::new();
    harness.remote.set_server(server_with_stories(&["One", "Two"]));
    harness.coordinator.start().await.unwrap();
    harness.store.add(Story::new("Local only"));

    harness
        .coordinator
        .login(&credentials("writer@example.com"))
        .await
        .unwrap();

    let mut titles = harness.story_titles();
    titles.sort();
    assert_eq!(titles, vec!["One", "Two"]);
    assert!(harness.remote.pushes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timer_push_inside_guard_window_is_suppressed() {
    let harness = Harness::signed_in("writer@example.com");
    harness.remote.set_server(server_with_stories(&["Saga"]));
    harness.coordinator.start().await.unwrap();

    assert_eq!(
        harness.coordinator.push_if_due(PushTrigger::Debounce).await,
        PushOutcome::Skipped(SkipReason::GuardWindow)
    );
    assert_eq!(
        harness.coordinator.push_if_due(PushTrigger::Periodic).await,
        PushOutcome::Skipped(SkipReason::GuardWindow)
    );
    assert!(harness.remote.pushes().is_empty());

    sleep(Duration::from_millis(3_001)).await;
    assert_eq!(
        harness.coordinator.push_if_due(PushTrigger::Debounce).await,
        PushOutcome::Pushed
    );
    assert_eq!(harness.remote.pushes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_mutations_coalesce_into_one_push() {
    let harness = Harness::signed_in("writer@example.com");
    harness.coordinator.start().await.unwrap();
    sleep(Duration::from_secs(4)).await;

    for index in 0..10 {
        harness.store.add(Story::new(format!("Story {index}")));
        sleep(Duration::from_millis(150)).await;
    }
    assert!(harness.remote.pushes().is_empty());

    sleep(Duration::from_millis(2_500)).await;
    let pushes = harness.remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].stories.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn logout_pushes_pending_changes_once_then_clears() {
    let harness = Harness::signed_in("writer@example.com");
    harness.coordinator.start().await.unwrap();
    sleep(Duration::from_secs(4)).await;

    harness.store.add(Story::new("Unsaved"));
    settle().await;
    assert!(harness.coordinator.is_debounce_armed());

    harness.coordinator.logout().await.unwrap();

    let pushes = harness.remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].stories[0].title, "Unsaved");
    assert!(harness.store.is_empty());
    assert_eq!(harness.store.current_user(), None);
    assert!(harness.scratch.load().unwrap().is_none());
    assert_eq!(harness.coordinator.phase(), SyncPhase::Anonymous);
    assert_eq!(harness.coordinator.status(), SyncStatus::Offline);

    sleep(Duration::from_secs(20)).await;
    assert_eq!(harness.remote.pushes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn logout_proceeds_when_auth_logout_fails() {
    let harness = Harness::signed_in("writer@example.com");
    harness.remote.set_server(server_with_stories(&["Saga"]));
    harness.auth.fail_logout.store(true, Ordering::SeqCst);
    harness.coordinator.start().await.unwrap();

    harness.coordinator.logout().await.unwrap();

    assert_eq!(harness.auth.logout_calls.load(Ordering::SeqCst), 1);
    assert!(harness.store.is_empty());
    assert_eq!(harness.coordinator.current_user(), None);
}

#[tokio::test(start_paused = true)]
async fn logout_without_session_is_rejected() {
    let harness = Harness::new();
    harness.coordinator.start().await.unwrap();

    assert!(matches!(
        harness.coordinator.logout().await,
        Err(SyncError::NotAuthenticated)
    ));
    assert_eq!(harness.auth.logout_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_pull_leaves_store_untouched_and_blocks_pushes() {
    let harness = Harness::signed_in("writer@example.com");
    harness.store.add(Story::new("Local"));
    harness.remote.set_server(server_with_stories(&["Server"]));
    harness.remote.fail_fetch.store(true, Ordering::SeqCst);
    let status = harness.coordinator.subscribe_status();

    let error = harness.coordinator.start().await.unwrap_err();
    assert!(matches!(error, SyncError::Network(_)));
    assert_eq!(harness.story_titles(), vec!["Local"]);
    assert_eq!(*status.borrow(), SyncStatus::Degraded);
    assert!(!harness.coordinator.report().reconciled);
    assert_eq!(harness.coordinator.report().consecutive_failures, 1);

    sleep(Duration::from_secs(5)).await;
    for trigger in [PushTrigger::Debounce, PushTrigger::Periodic, PushTrigger::Manual] {
        assert_eq!(
            harness.coordinator.push_if_due(trigger).await,
            PushOutcome::Skipped(SkipReason::Unreconciled)
        );
    }
    assert!(harness.remote.pushes().is_empty());

    harness.remote.fail_fetch.store(false, Ordering::SeqCst);
    harness.coordinator.periodic_tick().await;

    assert_eq!(harness.story_titles(), vec!["Server"]);
    assert_eq!(harness.coordinator.status(), SyncStatus::Synced);
    assert!(harness.coordinator.report().reconciled);
    assert!(harness.remote.pushes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn periodic_timer_retries_failed_pull() {
    let harness = Harness::signed_in("writer@example.com");
    harness.remote.set_server(server_with_stories(&["Server"]));
    harness.remote.fail_fetch.store(true, Ordering::SeqCst);
    assert!(harness.coordinator.start().await.is_err());

    harness.remote.fail_fetch.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(16)).await;

    assert_eq!(harness.remote.fetch_count(), 2);
    assert_eq!(harness.story_titles(), vec!["Server"]);
    assert!(harness.remote.pushes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exit_flush_uses_beacon_without_waiting_for_push_lane() {
    let harness = Harness::signed_in("writer@example.com");
    harness.coordinator.start().await.unwrap();
    sleep(Duration::from_secs(4)).await;
    harness.store.add(Story::new("Closing"));
    *harness.remote.save_delay.lock().unwrap() = Duration::from_secs(5);

    let coordinator = harness.coordinator.clone();
    let in_flight =
        tokio::spawn(async move { coordinator.push_if_due(PushTrigger::Manual).await });
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        harness.coordinator.push_if_due(PushTrigger::Periodic).await,
        PushOutcome::Skipped(SkipReason::InFlight)
    );
    assert_eq!(harness.coordinator.flush_on_exit(), PushOutcome::Beaconed);
    assert_eq!(harness.remote.beacon_count(), 1);
    assert!(harness.remote.pushes().is_empty());

    assert_eq!(in_flight.await.unwrap(), PushOutcome::Pushed);
    assert_eq!(harness.remote.pushes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exit_flush_respects_guard_window() {
    let harness = Harness::signed_in("writer@example.com");
    harness.remote.set_server(server_with_stories(&["Saga"]));
    harness.coordinator.start().await.unwrap();

    assert_eq!(
        harness.coordinator.flush_on_exit(),
        PushOutcome::Skipped(SkipReason::GuardWindow)
    );
    assert_eq!(harness.remote.beacon_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn register_pushes_local_data_immediately() {
    let harness = Harness::new();
    harness.coordinator.start().await.unwrap();
    harness.store.add(Story::new("Draft"));

    let user = harness
        .coordinator
        .register(&credentials("new@example.com"))
        .await
        .unwrap();

    assert_eq!(user, user_for("new@example.com"));
    assert_eq!(harness.remote.fetch_count(), 0);
    assert_eq!(harness.remote.pushes().len(), 1);
    assert_eq!(harness.remote.server().stories[0].title, "Draft");
    assert_eq!(harness.coordinator.phase(), SyncPhase::Idle);
    assert!(harness.coordinator.report().reconciled);

    // No pull happened, so there is no guard window to wait out.
    assert_eq!(
        harness.coordinator.push_if_due(PushTrigger::Debounce).await,
        PushOutcome::Pushed
    );
}

#[tokio::test(start_paused = true)]
async fn register_validation_failure_is_surfaced_verbatim() {
    let harness = Harness::new();
    harness.coordinator.start().await.unwrap();
    harness.store.add(Story::new("Draft"));

    let error = harness
        .coordinator
        .register(&credentials("taken@example.com"))
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "An account with this email already exists");
    assert_eq!(harness.coordinator.phase(), SyncPhase::Anonymous);
    assert_eq!(harness.story_titles(), vec!["Draft"]);
    assert!(harness.remote.pushes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_login_changes_nothing() {
    let harness = Harness::new();
    harness.coordinator.start().await.unwrap();
    harness.store.add(Story::new("Draft"));

    let error = harness
        .coordinator
        .login(&Credentials::new("writer@example.com", "wrong-password"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        SyncError::Auth(AuthError::InvalidCredentials)
    ));
    assert_eq!(harness.coordinator.phase(), SyncPhase::Anonymous);
    assert_eq!(harness.story_titles(), vec!["Draft"]);
    assert_eq!(harness.remote.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn switching_accounts_clears_previous_local_data() {
    let harness = Harness::signed_in("first@example.com");
    harness.coordinator.start().await.unwrap();
    harness.store.add(Story::new("First account story"));
    harness.remote.set_server(server_with_stories(&["Second account story"]));

    harness
        .coordinator
        .login(&credentials("second@example.com"))
        .await
        .unwrap();

    assert_eq!(harness.story_titles(), vec!["Second account story"]);
    assert_eq!(
        harness.coordinator.current_user(),
        Some(user_for("second@example.com"))
    );
    assert!(harness.remote.pushes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn anonymous_debounce_writes_scratch_instead_of_pushing() {
    let harness = Harness::new();
    harness.coordinator.start().await.unwrap();
    assert_eq!(harness.coordinator.status(), SyncStatus::Offline);

    harness.store.add(Story::new("Offline draft"));
    sleep(Duration::from_millis(2_500)).await;

    let saved = harness.scratch.load().unwrap().unwrap();
    assert_eq!(saved.stories[0].title, "Offline draft");
    assert!(harness.remote.pushes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scratch_restores_on_start_and_clears_after_reconcile() {
    let harness = Harness::new();
    harness
        .scratch
        .save(&server_with_stories(&["Recovered"]))
        .unwrap();

    harness.coordinator.start().await.unwrap();
    assert_eq!(harness.story_titles(), vec!["Recovered"]);

    harness
        .coordinator
        .login(&credentials("writer@example.com"))
        .await
        .unwrap();

    assert!(harness.scratch.load().unwrap().is_none());
    assert_eq!(harness.remote.server().stories[0].title, "Recovered");
}

#[tokio::test(start_paused = true)]
async fn pull_result_is_discarded_after_logout() {
    let harness = Harness::signed_in("writer@example.com");
    harness.remote.set_server(server_with_stories(&["Late"]));
    *harness.remote.fetch_delay.lock().unwrap() = Duration::from_secs(1);

    let coordinator = harness.coordinator.clone();
    let starting = tokio::spawn(async move { coordinator.start().await });
    sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.coordinator.phase(), SyncPhase::Pulling);

    harness.coordinator.logout().await.unwrap();
    let result = starting.await.unwrap();

    assert!(matches!(result, Err(SyncError::Superseded)));
    assert!(harness.store.is_empty());
    assert_eq!(harness.coordinator.phase(), SyncPhase::Anonymous);
    assert!(harness.remote.pushes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn manual_flush_skips_guard_window() {
    let harness = Harness::signed_in("writer@example.com");
    harness.coordinator.start().await.unwrap();
    harness
        .store
        .add(Story::new("Saved from the command line"));
    settle().await;

    assert_eq!(harness.coordinator.flush().await, PushOutcome::Pushed);
    assert!(!harness.coordinator.is_debounce_armed());
    assert_eq!(
        harness.remote.server().stories[0].title,
        "Saved from the command line"
    );
}

#[tokio::test(start_paused = true)]
async fn report_tracks_pull_and_push_times() {
    let harness = Harness::signed_in("writer@example.com");
    harness.coordinator.start().await.unwrap();
    let report = harness.coordinator.report();
    assert!(report.last_pull_at.is_some());
    assert!(report.last_push_at.is_none());

    harness.store.add(Story::new("Fresh"));
    harness.coordinator.flush().await;
    assert!(harness.coordinator.report().last_push_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn register_while_signed_in_uploads_current_data_to_new_account() {
    let harness = Harness::signed_in("first@example.com");
    harness.coordinator.start().await.unwrap();
    sleep(Duration::from_secs(4)).await;
    harness.store.add(Story::new("Local draft"));
    settle().await;

    harness
        .coordinator
        .register(&credentials("new@example.com"))
        .await
        .unwrap();

    let pushes = harness.remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].stories[0].title, "Local draft");
    assert_eq!(harness.story_titles(), vec!["Local draft"]);
    assert_eq!(
        harness.coordinator.current_user(),
        Some(user_for("new@example.com"))
    );
    assert_eq!(harness.coordinator.status(), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn timer_pushes_wait_while_login_is_authenticating() {
    let harness = Harness::signed_in("first@example.com");
    harness.coordinator.start().await.unwrap();
    sleep(Duration::from_secs(4)).await;
    harness.store.add(Story::new("Pending edit"));
    settle().await;
    assert!(harness.coordinator.is_debounce_armed());

    harness.remote.set_server(server_with_stories(&["Second account story"]));
    *harness.auth.login_delay.lock().unwrap() = Duration::from_secs(3);
    let coordinator = harness.coordinator.clone();
    let logging_in = tokio::spawn(async move {
        coordinator
            .login(&credentials("second@example.com"))
            .await
    });

    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(harness.coordinator.phase(), SyncPhase::Authenticating);
    assert!(!harness.coordinator.is_debounce_armed());
    assert_eq!(harness.remote.save_count(), 0);

    logging_in.await.unwrap().unwrap();
    assert_eq!(harness.story_titles(), vec!["Second account story"]);
    assert_eq!(harness.remote.save_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_account_switch_restores_session_and_pending_push() {
    let harness = Harness::signed_in("first@example.com");
    harness.coordinator.start().await.unwrap();
    sleep(Duration::from_secs(4)).await;
    harness.store.add(Story::new("Pending edit"));
    settle().await;

    *harness.auth.login_delay.lock().unwrap() = Duration::from_secs(1);
    let error = harness
        .coordinator
        .login(&Credentials::new("second@example.com", "wrong-password"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        SyncError::Auth(AuthError::InvalidCredentials)
    ));
    assert_eq!(harness.coordinator.phase(), SyncPhase::Idle);
    assert_eq!(
        harness.coordinator.current_user(),
        Some(user_for("first@example.com"))
    );
    assert!(harness.coordinator.is_debounce_armed());

    sleep(Duration::from_millis(2_500)).await;
    let pushes = harness.remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].stories[0].title, "Pending edit");
}

#[tokio::test(start_paused = true)]
async fn failed_push_degrades_status_and_next_tick_retries() {
    let harness = Harness::signed_in("writer@example.com");
    harness.coordinator.start().await.unwrap();
    sleep(Duration::from_secs(4)).await;

    harness.remote.fail_save.store(true, Ordering::SeqCst);
    harness.store.add(Story::new("Fragile"));
    sleep(Duration::from_millis(2_500)).await;

    assert_eq!(harness.remote.save_count(), 1);
    assert_eq!(harness.coordinator.status(), SyncStatus::Degraded);
    assert_eq!(harness.coordinator.report().consecutive_failures, 1);
    assert_eq!(harness.story_titles(), vec!["Fragile"]);
    assert!(harness.remote.pushes().is_empty());

    sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.remote.save_count(), 1);

    harness.remote.fail_save.store(false, Ordering::SeqCst);
    sleep(Duration::from_secs(7)).await;

    let pushes = harness.remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].stories[0].title, "Fragile");
    assert_eq!(harness.coordinator.status(), SyncStatus::Synced);
    assert_eq!(harness.coordinator.report().consecutive_failures, 0);
}
