use std::io;

use plotline_core::auth::AuthError;
use plotline_core::sync::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] plotline_core::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Entity ID cannot be empty")]
    EmptyEntityId,
    #[error("{0} cannot be empty")]
    EmptyText(&'static str),
    #[error("No {kind} found for id/prefix: {query}")]
    EntityNotFound { kind: &'static str, query: String },
    #[error("{0}")]
    AmbiguousEntityId(String),
    #[error("{0}")]
    InvalidEdit(String),
    #[error("--story is required when listing {0}s")]
    StoryRequired(&'static str),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Changes could not be uploaded: {0}")]
    Upload(String),
}
