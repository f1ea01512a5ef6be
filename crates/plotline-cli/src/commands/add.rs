use plotline_core::models::{
    Chapter, Character, IdeaCard, IdeaGroup, Location, LoreEntry, Relationship, Story, Tag,
    TimelineEvent,
};
use plotline_core::util::normalize_text_option;
use plotline_core::LocalStore;

use crate::cli::AddCommands;
use crate::commands::common::{
    next_order, normalize_required_text, open_session, resolve_entity, resolve_in_story,
};
use crate::error::CliError;
use crate::session::SessionOptions;

pub async fn run_add(command: AddCommands, options: &SessionOptions) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let id = add_entity(&session.store, command)?;
    session.finish().await?;

    println!("{id}");
    Ok(())
}

/// Validates references against the store, then inserts. Returns the new id.
pub fn add_entity(store: &LocalStore, command: AddCommands) -> Result<String, CliError> {
    let id = match command {
        AddCommands::Story {
            title,
            description,
            genre,
        } => {
            let mut story = Story::new(normalize_required_text(&title, "Title")?);
            story.description = description.unwrap_or_default();
            story.genre = normalize_text_option(genre);
            store.add(story).id
        }
        AddCommands::Character {
            story,
            name,
            role,
            description,
        } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let mut character =
                Character::new(story.id, normalize_required_text(&name, "Name")?);
            character.role = normalize_text_option(role);
            character.description = description.unwrap_or_default();
            store.add(character).id
        }
        AddCommands::Location {
            story,
            name,
            parent,
            description,
        } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let parent = parent
                .map(|query| resolve_in_story::<Location>(store, &story.id, &query))
                .transpose()?;
            let mut location = Location::new(story.id, normalize_required_text(&name, "Name")?);
            location.parent_id = parent.map(|parent| parent.id);
            location.description = description.unwrap_or_default();
            store.add(location).id
        }
        AddCommands::Event {
            story,
            title,
            order,
            chapter,
            location,
            characters,
        } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let chapter = chapter
                .map(|query| resolve_in_story::<Chapter>(store, &story.id, &query))
                .transpose()?;
            let location = location
                .map(|query| resolve_in_story::<Location>(store, &story.id, &query))
                .transpose()?;
            let character_ids = characters
                .iter()
                .map(|query| resolve_in_story::<Character>(store, &story.id, query).map(|c| c.id))
                .collect::<Result<Vec<_>, _>>()?;

            let order = order.unwrap_or_else(|| next_order::<TimelineEvent>(store, &story.id));
            let mut event =
                TimelineEvent::new(story.id, normalize_required_text(&title, "Title")?, order);
            event.chapter_id = chapter.map(|chapter| chapter.id);
            event.location_id = location.map(|location| location.id);
            event.character_ids = character_ids;
            store.add(event).id
        }
        AddCommands::Relationship {
            story,
            source,
            target,
            kind,
        } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let source = resolve_in_story::<Character>(store, &story.id, &source)?;
            let target = resolve_in_story::<Character>(store, &story.id, &target)?;
            let relationship = Relationship::new(
                story.id,
                source.id,
                target.id,
                normalize_required_text(&kind, "Relationship kind")?,
            );
            store.add(relationship).id
        }
        AddCommands::Lore {
            story,
            title,
            category,
            content,
        } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let mut entry = LoreEntry::new(story.id, normalize_required_text(&title, "Title")?);
            entry.category = normalize_text_option(category);
            entry.content = content.unwrap_or_default();
            store.add(entry).id
        }
        AddCommands::IdeaGroup { story, name, color } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let order = next_order::<IdeaGroup>(store, &story.id);
            let mut group =
                IdeaGroup::new(story.id, normalize_required_text(&name, "Name")?, order);
            group.color = normalize_text_option(color);
            store.add(group).id
        }
        AddCommands::IdeaCard {
            story,
            title,
            group,
            content,
        } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let group = group
                .map(|query| resolve_in_story::<IdeaGroup>(store, &story.id, &query))
                .transpose()?;
            let order = next_order::<IdeaCard>(store, &story.id);
            let mut card =
                IdeaCard::new(story.id, normalize_required_text(&title, "Title")?, order);
            if let Some(group) = group {
                card = card.in_group(group.id);
            }
            card.content = content.unwrap_or_default();
            store.add(card).id
        }
        AddCommands::Chapter {
            story,
            title,
            order,
            status,
        } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let order = order.unwrap_or_else(|| next_order::<Chapter>(store, &story.id));
            let mut chapter =
                Chapter::new(story.id, normalize_required_text(&title, "Title")?, order);
            if let Some(status) = status {
                chapter.status = status;
            }
            store.add(chapter).id
        }
        AddCommands::Tag { story, name, color } => {
            let story = resolve_entity::<Story>(store, &story)?;
            let mut tag = Tag::new(story.id, normalize_required_text(&name, "Name")?);
            tag.color = normalize_text_option(color);
            store.add(tag).id
        }
    };

    Ok(id.to_string())
}
