//! First-pull reconciliation between the server copy and local data.

use crate::models::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Replace local collections with the server snapshot.
    AdoptServer,
    /// Server has nothing; upload local data so it is not lost.
    PushLocal,
}

/// Decide what the first successful pull of a session does.
///
/// Server data always wins when present. Local data only survives when the
/// server copy is empty, and then it is pushed immediately.
#[must_use]
pub fn reconcile(server: &Snapshot, local: &Snapshot) -> Reconciliation {
    if server.is_empty() && !local.is_empty() {
        Reconciliation::PushLocal
    } else {
        Reconciliation::AdoptServer
    }
}
