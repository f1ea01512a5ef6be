//! Full-document sync unit

use serde::{Deserialize, Serialize};

use super::{
    Chapter, Character, EntityKind, IdeaCard, IdeaGroup, Location, LoreEntry, Relationship, Story,
    Tag, TimelineEvent,
};

/// Every entity collection belonging to one user.
///
/// Entities reference each other only by id, so a snapshot is
/// self-contained. Collections are unordered; list order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub stories: Vec<Story>,
    pub characters: Vec<Character>,
    pub locations: Vec<Location>,
    pub events: Vec<TimelineEvent>,
    pub relationships: Vec<Relationship>,
    pub lore_entries: Vec<LoreEntry>,
    pub idea_groups: Vec<IdeaGroup>,
    pub idea_cards: Vec<IdeaCard>,
    pub chapters: Vec<Chapter>,
    pub tags: Vec<Tag>,
}

/// Per-collection entity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCounts {
    pub stories: usize,
    pub characters: usize,
    pub locations: usize,
    pub events: usize,
    pub relationships: usize,
    pub lore_entries: usize,
    pub idea_groups: usize,
    pub idea_cards: usize,
    pub chapters: usize,
    pub tags: usize,
}

impl SnapshotCounts {
    #[must_use]
    pub const fn get(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Story => self.stories,
            EntityKind::Character => self.characters,
            EntityKind::Location => self.locations,
            EntityKind::Event => self.events,
            EntityKind::Relationship => self.relationships,
            EntityKind::LoreEntry => self.lore_entries,
            EntityKind::IdeaGroup => self.idea_groups,
            EntityKind::IdeaCard => self.idea_cards,
            EntityKind::Chapter => self.chapters,
            EntityKind::Tag => self.tags,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }
}

impl Snapshot {
    /// Whether the snapshot holds no entity of any type.
    ///
    /// Every collection counts: a snapshot with orphaned characters but no
    /// stories is still data worth protecting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    #[must_use]
    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            stories: self.stories.len(),
            characters: self.characters.len(),
            locations: self.locations.len(),
            events: self.events.len(),
            relationships: self.relationships.len(),
            lore_entries: self.lore_entries.len(),
            idea_groups: self.idea_groups.len(),
            idea_cards: self.idea_cards.len(),
            chapters: self.chapters.len(),
            tags: self.tags.len(),
        }
    }
}
