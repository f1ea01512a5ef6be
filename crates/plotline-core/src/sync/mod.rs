//! Pull/push coordination between the local store and the Plotline API.

mod coordinator;
mod reconcile;
mod scheduler;

#[cfg(test)]
mod tests;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;
use crate::models::Snapshot;

pub use coordinator::SyncCoordinator;
pub use reconcile::{reconcile, Reconciliation};
pub use scheduler::DebounceScheduler;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Network unavailable: {0}")]
    Network(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Session rejected by the server")]
    Unauthorized,
    #[error("Sync API error: {0}")]
    Api(String),
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Session changed while syncing")]
    Superseded,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Invalid snapshot payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] crate::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Remote side of sync: one snapshot per authenticated user.
#[async_trait]
pub trait SyncRemote: Send + Sync {
    /// Current server copy, or an all-empty snapshot for a new account.
    async fn fetch_snapshot(&self) -> SyncResult<Snapshot>;

    /// Replace the server copy wholesale.
    async fn save_snapshot(&self, snapshot: &Snapshot) -> SyncResult<()>;

    /// Fire-and-forget upload used while the process is going away.
    ///
    /// Must return without waiting on the network.
    fn send_beacon(&self, snapshot: Snapshot);
}

/// What asked for a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushTrigger {
    Debounce,
    Periodic,
    Manual,
    Adoption,
    Logout,
}

impl PushTrigger {
    /// Timer-driven pushes wait out the post-pull guard window.
    #[must_use]
    pub const fn respects_guard_window(self) -> bool {
        matches!(self, Self::Debounce | Self::Periodic)
    }

    /// Timer-driven pushes are dropped while another push is running.
    #[must_use]
    pub const fn waits_for_lane(self) -> bool {
        !matches!(self, Self::Debounce | Self::Periodic)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
            Self::Adoption => "adoption",
            Self::Logout => "logout",
        }
    }
}

impl fmt::Display for PushTrigger {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InFlight,
    GuardWindow,
    NotAuthenticated,
    Unreconciled,
    ShuttingDown,
}

/// Result of one attempt to persist local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed,
    /// No session: written to anonymous scratch persistence instead.
    SavedToScratch,
    /// Handed to the fire-and-forget exit transport; delivery is not confirmed.
    Beaconed,
    Skipped(SkipReason),
    Failed,
}

impl PushOutcome {
    #[must_use]
    pub const fn is_persisted(self) -> bool {
        matches!(self, Self::Pushed | Self::SavedToScratch)
    }
}
