//! Snapshot export helpers shared by clients.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::{EntityId, Snapshot, Story};

/// Export output format shared by all clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Copy of `snapshot` restricted to one story and everything scoped to it.
#[must_use]
pub fn scoped_to_story(snapshot: &Snapshot, story_id: &EntityId) -> Snapshot {
    fn keep<T: Clone>(items: &[T], owner: impl Fn(&T) -> &EntityId, story_id: &EntityId) -> Vec<T> {
        items
            .iter()
            .filter(|item| owner(item) == story_id)
            .cloned()
            .collect()
    }

    Snapshot {
        stories: snapshot
            .stories
            .iter()
            .filter(|story| &story.id == story_id)
            .cloned()
            .collect(),
        characters: keep(&snapshot.characters, |item| &item.story_id, story_id),
        locations: keep(&snapshot.locations, |item| &item.story_id, story_id),
        events: keep(&snapshot.events, |item| &item.story_id, story_id),
        relationships: keep(&snapshot.relationships, |item| &item.story_id, story_id),
        lore_entries: keep(&snapshot.lore_entries, |item| &item.story_id, story_id),
        idea_groups: keep(&snapshot.idea_groups, |item| &item.story_id, story_id),
        idea_cards: keep(&snapshot.idea_cards, |item| &item.story_id, story_id),
        chapters: keep(&snapshot.chapters, |item| &item.story_id, story_id),
        tags: keep(&snapshot.tags, |item| &item.story_id, story_id),
    }
}

/// Render the snapshot as pretty-printed JSON (same shape as `/sync`).
pub fn render_json_export(snapshot: &Snapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(snapshot)
}

/// Render one Markdown outline section per story, ordered by title.
#[must_use]
pub fn render_markdown_export(snapshot: &Snapshot) -> String {
    let mut stories: Vec<&Story> = snapshot.stories.iter().collect();
    stories.sort_by(|left, right| left.display_title().cmp(right.display_title()));

    let mut output = String::new();
    for (index, story) in stories.into_iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        render_story(&mut output, snapshot, story);
    }
    output
}

/// Render a snapshot based on selected export format.
pub fn render_snapshot_export(
    snapshot: &Snapshot,
    format: ExportFormat,
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(snapshot),
        ExportFormat::Markdown => Ok(render_markdown_export(snapshot)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("plotline-export-{timestamp_ms}.{}", format.extension())
}

fn render_story(output: &mut String, snapshot: &Snapshot, story: &Story) {
    let scoped = scoped_to_story(snapshot, &story.id);
    let name_of = |id: &EntityId| {
        scoped
            .characters
            .iter()
            .find(|character| &character.id == id)
            .map_or("unknown", |character| character.name.as_str())
    };

    let _ = writeln!(output, "# {}", story.display_title());
    if let Some(genre) = story.genre.as_deref() {
        let _ = writeln!(output, "_{genre}_");
    }
    if !story.description.trim().is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "{}", story.description.trim());
    }

    if !scoped.characters.is_empty() {
        let _ = writeln!(output, "\n## Characters");
        for character in &scoped.characters {
            let _ = write!(output, "- **{}**", character.name);
            if let Some(role) = character.role.as_deref() {
                let _ = write!(output, " ({role})");
            }
            if !character.description.trim().is_empty() {
                let _ = write!(output, ": {}", character.description.trim());
            }
            output.push('\n');
        }
    }

    if !scoped.relationships.is_empty() {
        let _ = writeln!(output, "\n## Relationships");
        for relationship in &scoped.relationships {
            let _ = writeln!(
                output,
                "- {} -> {}: {}",
                name_of(&relationship.source_id),
                name_of(&relationship.target_id),
                relationship.kind
            );
        }
    }

    if !scoped.locations.is_empty() {
        let _ = writeln!(output, "\n## Locations");
        for location in &scoped.locations {
            let _ = write!(output, "- **{}**", location.name);
            if !location.description.trim().is_empty() {
                let _ = write!(output, ": {}", location.description.trim());
            }
            output.push('\n');
        }
    }

    let mut chapters = scoped.chapters.clone();
    chapters.sort_by_key(|chapter| chapter.order);
    if !chapters.is_empty() {
        let _ = writeln!(output, "\n## Chapters");
        for chapter in &chapters {
            let _ = writeln!(output, "{}. {} [{}]", chapter.order + 1, chapter.title, chapter.status);
            if !chapter.summary.trim().is_empty() {
                let _ = writeln!(output, "   {}", chapter.summary.trim());
            }
        }
    }

    let mut events = scoped.events.clone();
    events.sort_by_key(|event| event.order);
    if !events.is_empty() {
        let _ = writeln!(output, "\n## Timeline");
        for event in &events {
            let _ = write!(output, "- {}", event.title);
            if let Some(location) = event
                .location_id
                .as_ref()
                .and_then(|id| scoped.locations.iter().find(|location| &location.id == id))
            {
                let _ = write!(output, " @ {}", location.name);
            }
            if !event.character_ids.is_empty() {
                let names: Vec<&str> = event.character_ids.iter().map(name_of).collect();
                let _ = write!(output, " ({})", names.join(", "));
            }
            output.push('\n');
        }
    }

    if !scoped.lore_entries.is_empty() {
        let _ = writeln!(output, "\n## Lore");
        for entry in &scoped.lore_entries {
            match entry.category.as_deref() {
                Some(category) => {
                    let _ = writeln!(output, "### {} ({category})", entry.title);
                }
                None => {
                    let _ = writeln!(output, "### {}", entry.title);
                }
            }
            if !entry.content.trim().is_empty() {
                let _ = writeln!(output, "{}", entry.content.trim());
            }
        }
    }

    if !scoped.idea_cards.is_empty() {
        let _ = writeln!(output, "\n## Ideas");
        let mut cards = scoped.idea_cards.clone();
        cards.sort_by_key(|card| card.order);
        for card in &cards {
            let group = card
                .group_id
                .as_ref()
                .and_then(|id| scoped.idea_groups.iter().find(|group| &group.id == id));
            match group {
                Some(group) => {
                    let _ = writeln!(output, "- [{}] {}", group.name, card.title);
                }
                None => {
                    let _ = writeln!(output, "- {}", card.title);
                }
            }
        }
    }
}
