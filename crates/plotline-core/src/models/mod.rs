//! Data models for Plotline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Implements the identity, timestamp and collection accessors shared by all
/// entities. Every entity struct has `id`, `created_at` and `updated_at`.
macro_rules! entity_basics {
    ($collection:ident) => {
        fn id(&self) -> &$crate::models::EntityId {
            &self.id
        }

        fn stamp(&mut self, id: $crate::models::EntityId, now: chrono::DateTime<chrono::Utc>) {
            self.id = id;
            self.created_at = now;
            self.updated_at = now;
        }

        fn touch(&mut self, now: chrono::DateTime<chrono::Utc>) {
            self.updated_at = now;
        }

        fn collection(snapshot: &$crate::models::Snapshot) -> &Vec<Self> {
            &snapshot.$collection
        }

        fn collection_mut(snapshot: &mut $crate::models::Snapshot) -> &mut Vec<Self> {
            &mut snapshot.$collection
        }
    };
}

mod chapter;
mod character;
mod event;
mod id;
mod idea;
mod location;
mod lore;
mod relationship;
mod snapshot;
mod story;
mod tag;

pub use chapter::{Chapter, ChapterStatus};
pub use character::Character;
pub use event::TimelineEvent;
pub use id::EntityId;
pub use idea::{IdeaCard, IdeaGroup};
pub use location::Location;
pub use lore::LoreEntry;
pub use relationship::Relationship;
pub use snapshot::{Snapshot, SnapshotCounts};
pub use story::Story;
pub use tag::Tag;

/// Entity collections carried in a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Story,
    Character,
    Location,
    Event,
    Relationship,
    LoreEntry,
    IdeaGroup,
    IdeaCard,
    Chapter,
    Tag,
}

impl EntityKind {
    pub const ALL: [Self; 10] = [
        Self::Story,
        Self::Character,
        Self::Location,
        Self::Event,
        Self::Relationship,
        Self::LoreEntry,
        Self::IdeaGroup,
        Self::IdeaCard,
        Self::Chapter,
        Self::Tag,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Character => "character",
            Self::Location => "location",
            Self::Event => "event",
            Self::Relationship => "relationship",
            Self::LoreEntry => "lore_entry",
            Self::IdeaGroup => "idea_group",
            Self::IdeaCard => "idea_card",
            Self::Chapter => "chapter",
            Self::Tag => "tag",
        }
    }
}

/// Common surface of every entity stored in a [`Snapshot`].
///
/// The store uses this to address a collection generically; each entity
/// decides whether it is story-scoped and whether it carries an explicit
/// `order`.
pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &EntityId;

    /// Owning story, `None` for stories themselves.
    fn story_id(&self) -> Option<&EntityId>;

    /// Explicit position for ordered entities.
    fn sort_order(&self) -> Option<i64> {
        None
    }

    /// Assign a fresh identity and creation/update timestamps.
    fn stamp(&mut self, id: EntityId, now: DateTime<Utc>);

    /// Refresh the update timestamp.
    fn touch(&mut self, now: DateTime<Utc>);

    fn collection(snapshot: &Snapshot) -> &Vec<Self>;

    fn collection_mut(snapshot: &mut Snapshot) -> &mut Vec<Self>;
}
