//! Location model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// A place in a story; locations may nest through `parent_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: EntityId,
    pub story_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
    #[serde(default)]
    pub tag_ids: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    #[must_use]
    pub fn new(story_id: EntityId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            name: name.into(),
            description: String::new(),
            parent_id: None,
            tag_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Location {
    const KIND: EntityKind = EntityKind::Location;

    entity_basics!(locations);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }
}
