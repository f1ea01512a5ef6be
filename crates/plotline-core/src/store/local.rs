//! In-memory observable entity store

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio::sync::broadcast;

use super::cascade::remove_dependents;
use super::{ChangeKind, SnapshotStore, StoreChange};
use crate::auth::AuthUser;
use crate::models::{Entity, EntityId, EntityKind, Snapshot, SnapshotCounts};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct StoreData {
    snapshot: Snapshot,
    current_user: Option<AuthUser>,
    revision: u64,
}

/// Application-wide entity store.
///
/// Missing ids are tolerated: `update` and `delete` on an absent entity are
/// no-ops. Every write publishes a [`StoreChange`] to subscribers.
pub struct LocalStore {
    data: RwLock<StoreData>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            data: RwLock::new(StoreData::default()),
            changes,
        }
    }

    /// Create a store pre-populated with `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        store.write().snapshot = snapshot;
        store
    }

    /// Insert `entity` under a fresh id with fresh timestamps.
    pub fn add<E: Entity>(&self, mut entity: E) -> E {
        entity.stamp(EntityId::new(), Utc::now());
        let revision = {
            let mut data = self.write();
            E::collection_mut(&mut data.snapshot).push(entity.clone());
            bump(&mut data)
        };
        tracing::debug!(kind = E::KIND.label(), id = %entity.id(), "Added entity");
        self.publish(revision, ChangeKind::Mutation);
        entity
    }

    /// Apply `change` to the entity with `id` and refresh its update time.
    ///
    /// Returns `false` without publishing anything when the id is unknown.
    pub fn update<E: Entity>(&self, id: &EntityId, change: impl FnOnce(&mut E)) -> bool {
        let revision = {
            let mut data = self.write();
            let Some(entity) = E::collection_mut(&mut data.snapshot)
                .iter_mut()
                .find(|entity| entity.id() == id)
            else {
                return false;
            };
            change(entity);
            entity.touch(Utc::now());
            bump(&mut data)
        };
        self.publish(revision, ChangeKind::Mutation);
        true
    }

    /// Remove the entity with `id` together with its dependents.
    ///
    /// Returns `false` without publishing anything when the id is unknown.
    pub fn delete<E: Entity>(&self, id: &EntityId) -> bool {
        let revision = {
            let mut data = self.write();
            let collection = E::collection_mut(&mut data.snapshot);
            let before = collection.len();
            collection.retain(|entity| entity.id() != id);
            if collection.len() == before {
                return false;
            }
            remove_dependents(&mut data.snapshot, E::KIND, id);
            bump(&mut data)
        };
        tracing::debug!(kind = E::KIND.label(), %id, "Deleted entity");
        self.publish(revision, ChangeKind::Mutation);
        true
    }

    pub fn get<E: Entity>(&self, id: &EntityId) -> Option<E> {
        let data = self.read();
        E::collection(&data.snapshot)
            .iter()
            .find(|entity| entity.id() == id)
            .cloned()
    }

    pub fn list<E: Entity>(&self) -> Vec<E> {
        E::collection(&self.read().snapshot).clone()
    }

    /// Entities scoped to `story_id`; ordered entities come back stable-sorted
    /// by their `order` field.
    pub fn list_by_story<E: Entity>(&self, story_id: &EntityId) -> Vec<E> {
        let mut items: Vec<E> = E::collection(&self.read().snapshot)
            .iter()
            .filter(|entity| entity.story_id() == Some(story_id))
            .cloned()
            .collect();
        items.sort_by_key(|entity| entity.sort_order());
        items
    }

    /// Per-type entity counts for one story, `None` if the story is unknown.
    pub fn story_overview(&self, story_id: &EntityId) -> Option<SnapshotCounts> {
        let data = self.read();
        let snapshot = &data.snapshot;
        if !snapshot.stories.iter().any(|story| &story.id == story_id) {
            return None;
        }

        let scoped = |kind: EntityKind| -> usize {
            match kind {
                EntityKind::Story => 1,
                EntityKind::Character => count_scoped(&snapshot.characters, story_id),
                EntityKind::Location => count_scoped(&snapshot.locations, story_id),
                EntityKind::Event => count_scoped(&snapshot.events, story_id),
                EntityKind::Relationship => count_scoped(&snapshot.relationships, story_id),
                EntityKind::LoreEntry => count_scoped(&snapshot.lore_entries, story_id),
                EntityKind::IdeaGroup => count_scoped(&snapshot.idea_groups, story_id),
                EntityKind::IdeaCard => count_scoped(&snapshot.idea_cards, story_id),
                EntityKind::Chapter => count_scoped(&snapshot.chapters, story_id),
                EntityKind::Tag => count_scoped(&snapshot.tags, story_id),
            }
        };

        Some(SnapshotCounts {
            stories: scoped(EntityKind::Story),
            characters: scoped(EntityKind::Character),
            locations: scoped(EntityKind::Location),
            events: scoped(EntityKind::Event),
            relationships: scoped(EntityKind::Relationship),
            lore_entries: scoped(EntityKind::LoreEntry),
            idea_groups: scoped(EntityKind::IdeaGroup),
            idea_cards: scoped(EntityKind::IdeaCard),
            chapters: scoped(EntityKind::Chapter),
            tags: scoped(EntityKind::Tag),
        })
    }

    /// Monotonic counter bumped by every write.
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, revision: u64, kind: ChangeKind) {
        // No subscribers is fine; the store is usable without a coordinator.
        let _ = self.changes.send(StoreChange { revision, kind });
    }
}

impl SnapshotStore for LocalStore {
    fn export_snapshot(&self) -> Snapshot {
        self.read().snapshot.clone()
    }

    fn load_snapshot(&self, snapshot: Snapshot) {
        let revision = {
            let mut data = self.write();
            data.snapshot = snapshot;
            bump(&mut data)
        };
        self.publish(revision, ChangeKind::Replaced);
    }

    fn clear_all(&self) {
        let revision = {
            let mut data = self.write();
            let revision = data.revision + 1;
            *data = StoreData {
                snapshot: Snapshot::default(),
                current_user: None,
                revision,
            };
            revision
        };
        self.publish(revision, ChangeKind::Cleared);
    }

    fn is_empty(&self) -> bool {
        self.read().snapshot.is_empty()
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.read().current_user.clone()
    }

    fn set_current_user(&self, user: Option<AuthUser>) {
        self.write().current_user = user;
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

fn bump(data: &mut StoreData) -> u64 {
    data.revision += 1;
    data.revision
}

fn count_scoped<E: Entity>(items: &[E], story_id: &EntityId) -> usize {
    items
        .iter()
        .filter(|item| item.story_id() == Some(story_id))
        .count()
}
