use plotline_core::models::{Chapter, Story};
use plotline_core::LocalStore;

use crate::commands::common::{open_session, resolve_entity};
use crate::error::CliError;
use crate::session::SessionOptions;

pub async fn run_show(story: &str, options: &SessionOptions) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let lines = story_outline(&session.store, story)?;
    session.finish().await?;

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// Title, description, element counts and the chapter list of one story.
pub fn story_outline(store: &LocalStore, query: &str) -> Result<Vec<String>, CliError> {
    let story = resolve_entity::<Story>(store, query)?;
    let counts = store
        .story_overview(&story.id)
        .ok_or_else(|| CliError::EntityNotFound {
            kind: "story",
            query: query.to_string(),
        })?;

    let mut lines = vec![format!("{} ({})", story.display_title(), story.id)];
    if let Some(genre) = &story.genre {
        lines.push(format!("Genre: {genre}"));
    }
    if !story.description.trim().is_empty() {
        lines.push(story.description.trim().to_string());
    }
    lines.push(String::new());
    lines.push(format!("Characters:    {}", counts.characters));
    lines.push(format!("Locations:     {}", counts.locations));
    lines.push(format!("Events:        {}", counts.events));
    lines.push(format!("Relationships: {}", counts.relationships));
    lines.push(format!("Lore entries:  {}", counts.lore_entries));
    lines.push(format!("Idea groups:   {}", counts.idea_groups));
    lines.push(format!("Idea cards:    {}", counts.idea_cards));
    lines.push(format!("Chapters:      {}", counts.chapters));
    lines.push(format!("Tags:          {}", counts.tags));

    let chapters = store.list_by_story::<Chapter>(&story.id);
    if !chapters.is_empty() {
        lines.push(String::new());
        for chapter in chapters {
            lines.push(format!(
                "  {}. {} [{}]",
                chapter.order, chapter.title, chapter.status
            ));
        }
    }

    Ok(lines)
}
