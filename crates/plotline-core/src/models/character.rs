//! Character model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// A character in a story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: EntityId,
    pub story_id: EntityId,
    pub name: String,
    /// Narrative role, e.g. "protagonist"
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub tag_ids: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Character {
    #[must_use]
    pub fn new(story_id: EntityId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            name: name.into(),
            role: None,
            description: String::new(),
            traits: Vec::new(),
            tag_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Character {
    const KIND: EntityKind = EntityKind::Character;

    entity_basics!(characters);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }
}
