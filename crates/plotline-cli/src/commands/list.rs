use plotline_core::models::Story;
use plotline_core::{EntityKind, LocalStore};

use crate::commands::common::{
    format_entity_lines, list_items, open_session, resolve_entity, EntityListItem,
};
use crate::error::CliError;
use crate::session::SessionOptions;

pub async fn run_list(
    kind: EntityKind,
    story: Option<&str>,
    as_json: bool,
    options: &SessionOptions,
) -> Result<(), CliError> {
    let session = open_session(options).await?;
    let items = collect_items(&session.store, kind, story)?;
    session.finish().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No {}s yet.", kind.label());
    } else {
        for line in format_entity_lines(&items) {
            println!("{line}");
        }
    }

    Ok(())
}

pub fn collect_items(
    store: &LocalStore,
    kind: EntityKind,
    story: Option<&str>,
) -> Result<Vec<EntityListItem>, CliError> {
    let story_id = story
        .map(|query| resolve_entity::<Story>(store, query).map(|story| story.id))
        .transpose()?;
    dispatch_kind!(kind, list_items(store, story_id.as_ref()))
}
