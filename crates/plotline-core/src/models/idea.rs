//! Idea board models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// A column on the idea board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaGroup {
    pub id: EntityId,
    pub story_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdeaGroup {
    #[must_use]
    pub fn new(story_id: EntityId, name: impl Into<String>, order: i64) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            name: name.into(),
            color: None,
            order,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for IdeaGroup {
    const KIND: EntityKind = EntityKind::IdeaGroup;

    entity_basics!(idea_groups);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }

    fn sort_order(&self) -> Option<i64> {
        Some(self.order)
    }
}

/// A single idea; ungrouped cards have no `group_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaCard {
    pub id: EntityId,
    pub story_id: EntityId,
    #[serde(default)]
    pub group_id: Option<EntityId>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdeaCard {
    #[must_use]
    pub fn new(story_id: EntityId, title: impl Into<String>, order: i64) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            group_id: None,
            title: title.into(),
            content: String::new(),
            order,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn in_group(mut self, group_id: EntityId) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

impl Entity for IdeaCard {
    const KIND: EntityKind = EntityKind::IdeaCard;

    entity_basics!(idea_cards);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }

    fn sort_order(&self) -> Option<i64> {
        Some(self.order)
    }
}
