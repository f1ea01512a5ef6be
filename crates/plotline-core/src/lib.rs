//! plotline-core - Core library for Plotline
//!
//! Entity models, the observable local store, anonymous scratch persistence,
//! and the sync coordinator shared by every Plotline client and the API.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{EntityId, EntityKind, Snapshot};
pub use store::{LocalStore, SnapshotStore};
pub use sync::SyncCoordinator;
