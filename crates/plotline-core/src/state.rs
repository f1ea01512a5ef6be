//! Shared sync state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;

/// Coarse sync status published to UIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No session: data lives locally only.
    Offline,
    Syncing,
    Synced,
    /// The last pull or push failed; the next tick retries.
    Degraded,
}

/// Where the coordinator is in its session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Anonymous,
    Authenticating,
    Pulling,
    Idle,
    Pushing,
    LoggingOut,
}

impl SyncPhase {
    /// Pulling, Idle and Pushing all carry an authenticated identity.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Pulling | Self::Idle | Self::Pushing)
    }
}

/// Point-in-time view of the coordinator for status output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub phase: SyncPhase,
    pub status: SyncStatus,
    pub user: Option<AuthUser>,
    pub reconciled: bool,
    pub last_pull_at: Option<DateTime<Utc>>,
    pub last_push_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}
