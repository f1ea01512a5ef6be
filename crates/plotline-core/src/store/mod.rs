//! Local entity store and anonymous scratch persistence

mod cascade;
mod local;
mod scratch;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::auth::AuthUser;
use crate::models::Snapshot;

pub use local::LocalStore;
pub use scratch::{FileScratchStore, MemoryScratchStore, ScratchStore};

/// What kind of write produced a [`StoreChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A user-driven add/update/delete.
    Mutation,
    /// Every collection was swapped for a loaded snapshot.
    Replaced,
    /// Every collection and the current user were reset.
    Cleared,
}

/// Notification published after each store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub revision: u64,
    pub kind: ChangeKind,
}

/// Capability the sync coordinator needs from the local store.
///
/// Implemented by [`LocalStore`]; tests may substitute their own.
pub trait SnapshotStore: Send + Sync {
    /// Owned copy of every collection.
    fn export_snapshot(&self) -> Snapshot;

    /// Replace every collection with `snapshot` in one step.
    fn load_snapshot(&self, snapshot: Snapshot);

    /// Reset every collection and the current-user slot.
    fn clear_all(&self);

    fn is_empty(&self) -> bool;

    fn current_user(&self) -> Option<AuthUser>;

    fn set_current_user(&self, user: Option<AuthUser>);

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}
