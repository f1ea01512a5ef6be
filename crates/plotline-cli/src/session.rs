//! One CLI invocation's view of the sync stack.
//!
//! Opening a session restores the stored login (or the signed-out scratch
//! copy) into a fresh [`LocalStore`]; finishing it uploads whatever the
//! command changed before the process exits.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use plotline_core::client::PlotlineClient;
use plotline_core::config::{ClientConfig, SyncSettings};
use plotline_core::store::FileScratchStore;
use plotline_core::sync::PushOutcome;
use plotline_core::{LocalStore, SyncCoordinator};

use crate::auth::KeyringSessionStore;
use crate::error::CliError;

const SCRATCH_FILE_NAME: &str = "scratch.json";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub profile_name: String,
    pub api: ClientConfig,
    pub data_dir: PathBuf,
    pub settings: SyncSettings,
}

impl SessionOptions {
    /// Signed-out data lives in a per-profile directory.
    pub fn scratch_path(&self) -> PathBuf {
        profile_dir(&self.data_dir, &self.profile_name).join(SCRATCH_FILE_NAME)
    }
}

pub struct CliSession {
    pub profile_name: String,
    pub store: Arc<LocalStore>,
    pub coordinator: SyncCoordinator,
    client: PlotlineClient<KeyringSessionStore>,
    baseline_revision: AtomicU64,
}

impl CliSession {
    pub fn open(options: &SessionOptions) -> Result<Self, CliError> {
        let store = Arc::new(LocalStore::new());
        let client = PlotlineClient::new(
            options.api.clone(),
            KeyringSessionStore::new(&options.profile_name),
            &options.settings,
        )?;
        let remote = Arc::new(client.clone());
        let coordinator = SyncCoordinator::new(
            store.clone(),
            remote.clone(),
            remote,
            Arc::new(FileScratchStore::new(options.scratch_path())),
            options.settings,
        );

        Ok(Self {
            profile_name: options.profile_name.clone(),
            store,
            coordinator,
            client,
            baseline_revision: AtomicU64::new(0),
        })
    }

    /// Restore the session and reconcile. Commands only run on a store that
    /// reflects the server, so a failed pull is an error here.
    pub async fn start(&self) -> Result<(), CliError> {
        self.coordinator.start().await?;
        self.rebaseline();
        Ok(())
    }

    /// Treat the current store contents as already persisted.
    ///
    /// Login and register leave the store matching the server, so the
    /// snapshot they load must not count as a local change.
    pub fn rebaseline(&self) {
        self.baseline_revision
            .store(self.store.revision(), Ordering::SeqCst);
    }

    pub fn api_base_url(&self) -> &str {
        &self.client.config().api_base_url
    }

    /// Stored token expiry, without contacting the server.
    pub fn session_expires_at(&self) -> Option<i64> {
        match self.client.stored_session() {
            Ok(session) => session.map(|session| session.expires_at),
            Err(error) => {
                tracing::warn!("Failed to read stored session: {}", error);
                None
            }
        }
    }

    pub fn has_local_changes(&self) -> bool {
        self.store.revision() != self.baseline_revision.load(Ordering::SeqCst)
    }

    /// Persist local changes (upload or scratch save) and stop background work.
    ///
    /// Returns `None` when the command changed nothing.
    pub async fn finish(&self) -> Result<Option<PushOutcome>, CliError> {
        let outcome = if self.has_local_changes() {
            Some(self.coordinator.flush().await)
        } else {
            None
        };
        self.coordinator.shutdown();

        if outcome == Some(PushOutcome::Failed) {
            return Err(CliError::Upload(format!(
                "the server at {} did not accept the update",
                self.api_base_url()
            )));
        }
        tracing::debug!(outcome = ?outcome, "Session finished");
        Ok(outcome)
    }
}

fn profile_dir(data_dir: &Path, profile_name: &str) -> PathBuf {
    let safe_name: String = profile_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    data_dir.join("profiles").join(safe_name)
}
