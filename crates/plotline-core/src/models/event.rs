//! Timeline event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// A point on a story's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: EntityId,
    pub story_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Position on the timeline; lower comes first
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub location_id: Option<EntityId>,
    #[serde(default)]
    pub chapter_id: Option<EntityId>,
    #[serde(default)]
    pub character_ids: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimelineEvent {
    #[must_use]
    pub fn new(story_id: EntityId, title: impl Into<String>, order: i64) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            title: title.into(),
            description: String::new(),
            order,
            location_id: None,
            chapter_id: None,
            character_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for TimelineEvent {
    const KIND: EntityKind = EntityKind::Event;

    entity_basics!(events);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }

    fn sort_order(&self) -> Option<i64> {
        Some(self.order)
    }
}
