//! Lore entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// World-building note: history, magic systems, factions and the like
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoreEntry {
    pub id: EntityId,
    pub story_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tag_ids: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoreEntry {
    #[must_use]
    pub fn new(story_id: EntityId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            title: title.into(),
            category: None,
            content: String::new(),
            tag_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for LoreEntry {
    const KIND: EntityKind = EntityKind::LoreEntry;

    entity_basics!(lore_entries);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }
}
