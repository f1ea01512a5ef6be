//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// A story-scoped label attachable to characters, locations and lore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Unique identifier
    pub id: EntityId,
    pub story_id: EntityId,
    /// Tag name (stored in lowercase)
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new tag with the given name
    ///
    /// The name is trimmed and converted to lowercase.
    #[must_use]
    pub fn new(story_id: EntityId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            name: name.into().trim().to_lowercase(),
            color: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Tag {
    const KIND: EntityKind = EntityKind::Tag;

    entity_basics!(tags);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new_lowercase() {
        let tag = Tag::new(EntityId::from("s1"), " Hello ");
        assert_eq!(tag.name, "hello");
    }

    #[test]
    fn test_tag_id_unique() {
        let story = EntityId::from("s1");
        let first = Tag::new(story.clone(), "a");
        let second = Tag::new(story, "a");
        assert_ne!(first.id, second.id);
    }
}
