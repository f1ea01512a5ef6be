//! Anonymous-mode scratch persistence.
//!
//! Before any login the store is mirrored here so work survives restarts.
//! Scratch data is wiped once an authenticated session has reconciled with
//! the server, so it can never bleed into another account.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::Result;
use crate::models::Snapshot;

pub trait ScratchStore: Send + Sync {
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON file next to the rest of the client's local data.
#[derive(Debug, Clone)]
pub struct FileScratchStore {
    path: PathBuf,
}

impl FileScratchStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScratchStore for FileScratchStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Staged then renamed: readers never observe a partial snapshot.
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, serde_json::to_vec(snapshot)?)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Process-local scratch space, used by tests and ephemeral clients.
#[derive(Debug, Default)]
pub struct MemoryScratchStore {
    slot: Mutex<Option<Snapshot>>,
}

impl ScratchStore for MemoryScratchStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
