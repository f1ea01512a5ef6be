//! Story model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// Top-level container every other entity is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Unique identifier
    pub id: EntityId,
    /// Working title
    pub title: String,
    /// Logline or synopsis
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Story {
    /// Create a new story with the given title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            title: title.into(),
            description: String::new(),
            genre: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get the title, falling back to a placeholder for blank titles
    #[must_use]
    pub fn display_title(&self) -> &str {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            "Untitled story"
        } else {
            trimmed
        }
    }
}

impl Entity for Story {
    const KIND: EntityKind = EntityKind::Story;

    entity_basics!(stories);

    fn story_id(&self) -> Option<&EntityId> {
        None
    }
}
