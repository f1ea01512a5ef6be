//! Dependent-row cleanup run inside the same write as a delete.

use crate::models::{EntityId, EntityKind, Snapshot};

/// Remove or unlink everything that depends on the deleted entity.
pub(super) fn remove_dependents(snapshot: &mut Snapshot, kind: EntityKind, id: &EntityId) {
    match kind {
        EntityKind::Story => remove_story_scope(snapshot, id),
        EntityKind::Character => {
            snapshot
                .relationships
                .retain(|relationship| !relationship.involves(id));
            for event in &mut snapshot.events {
                event.character_ids.retain(|character_id| character_id != id);
            }
        }
        EntityKind::Location => {
            for event in &mut snapshot.events {
                if event.location_id.as_ref() == Some(id) {
                    event.location_id = None;
                }
            }
            for location in &mut snapshot.locations {
                if location.parent_id.as_ref() == Some(id) {
                    location.parent_id = None;
                }
            }
        }
        EntityKind::Chapter => {
            for event in &mut snapshot.events {
                if event.chapter_id.as_ref() == Some(id) {
                    event.chapter_id = None;
                }
            }
        }
        EntityKind::IdeaGroup => {
            snapshot
                .idea_cards
                .retain(|card| card.group_id.as_ref() != Some(id));
        }
        EntityKind::Tag => {
            for character in &mut snapshot.characters {
                character.tag_ids.retain(|tag_id| tag_id != id);
            }
            for location in &mut snapshot.locations {
                location.tag_ids.retain(|tag_id| tag_id != id);
            }
            for entry in &mut snapshot.lore_entries {
                entry.tag_ids.retain(|tag_id| tag_id != id);
            }
        }
        EntityKind::Event
        | EntityKind::Relationship
        | EntityKind::LoreEntry
        | EntityKind::IdeaCard => {}
    }
}

fn remove_story_scope(snapshot: &mut Snapshot, story_id: &EntityId) {
    snapshot.characters.retain(|item| &item.story_id != story_id);
    snapshot.locations.retain(|item| &item.story_id != story_id);
    snapshot.events.retain(|item| &item.story_id != story_id);
    snapshot
        .relationships
        .retain(|item| &item.story_id != story_id);
    snapshot
        .lore_entries
        .retain(|item| &item.story_id != story_id);
    snapshot.idea_groups.retain(|item| &item.story_id != story_id);
    snapshot.idea_cards.retain(|item| &item.story_id != story_id);
    snapshot.chapters.retain(|item| &item.story_id != story_id);
    snapshot.tags.retain(|item| &item.story_id != story_id);
}
