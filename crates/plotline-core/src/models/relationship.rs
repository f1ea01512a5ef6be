//! Relationship model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// A directed link between two characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: EntityId,
    pub story_id: EntityId,
    pub source_id: EntityId,
    pub target_id: EntityId,
    /// Free-form label such as "sibling" or "rival"
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    #[must_use]
    pub fn new(
        story_id: EntityId,
        source_id: EntityId,
        target_id: EntityId,
        kind: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            source_id,
            target_id,
            kind: kind.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the character appears on either side of this relationship
    #[must_use]
    pub fn involves(&self, character_id: &EntityId) -> bool {
        &self.source_id == character_id || &self.target_id == character_id
    }
}

impl Entity for Relationship {
    const KIND: EntityKind = EntityKind::Relationship;

    entity_basics!(relationships);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }
}
