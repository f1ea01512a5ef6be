use std::env;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use plotline_core::config::{ClientConfig, SyncSettings};
use plotline_core::models::{
    Chapter, ChapterStatus, Character, Entity, IdeaCard, IdeaGroup, Location, LoreEntry,
    Relationship, Story, Tag, TimelineEvent,
};
use plotline_core::state::SyncReport;
use plotline_core::sync::PushOutcome;
use plotline_core::{EntityId, EntityKind, LocalStore};
use serde::Serialize;

use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;
use crate::session::{CliSession, SessionOptions};

const SHORT_ID_CHARS: usize = 13;

/// How an entity shows up in listings.
pub trait Describe: Entity {
    fn label(&self) -> String;

    fn detail(&self) -> Option<String> {
        None
    }
}

impl Describe for Story {
    fn label(&self) -> String {
        self.display_title().to_string()
    }

    fn detail(&self) -> Option<String> {
        self.genre.clone()
    }
}

impl Describe for Character {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn detail(&self) -> Option<String> {
        self.role.clone()
    }
}

impl Describe for Location {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn detail(&self) -> Option<String> {
        self.parent_id
            .as_ref()
            .map(|parent| format!("in {}", short_id(parent)))
    }
}

impl Describe for TimelineEvent {
    fn label(&self) -> String {
        self.title.clone()
    }

    fn detail(&self) -> Option<String> {
        Some(format!("#{}", self.order))
    }
}

impl Describe for Relationship {
    fn label(&self) -> String {
        format!(
            "{} -> {}",
            short_id(&self.source_id),
            short_id(&self.target_id)
        )
    }

    fn detail(&self) -> Option<String> {
        normalize_text(&self.kind)
    }
}

impl Describe for LoreEntry {
    fn label(&self) -> String {
        self.title.clone()
    }

    fn detail(&self) -> Option<String> {
        self.category.clone()
    }
}

impl Describe for IdeaGroup {
    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Describe for IdeaCard {
    fn label(&self) -> String {
        self.title.clone()
    }

    fn detail(&self) -> Option<String> {
        self.group_id
            .as_ref()
            .map(|group| format!("group {}", short_id(group)))
    }
}

impl Describe for Chapter {
    fn label(&self) -> String {
        self.title.clone()
    }

    fn detail(&self) -> Option<String> {
        Some(format!("{}. [{}]", self.order, self.status))
    }
}

impl Describe for Tag {
    fn label(&self) -> String {
        format!("#{}", self.name)
    }

    fn detail(&self) -> Option<String> {
        self.color.clone()
    }
}

/// Field changes requested by `plotline edit`.
#[derive(Debug, Clone, Default)]
pub struct EntityEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub status: Option<ChapterStatus>,
}

impl EntityEdit {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.order.is_none()
            && self.status.is_none()
    }

    fn name(&self) -> Result<Option<String>, CliError> {
        self.name
            .as_deref()
            .map(|name| normalize_required_text(name, "Name"))
            .transpose()
    }

    fn reject_order(&self, kind: EntityKind) -> Result<(), CliError> {
        if self.order.is_some() {
            return Err(unsupported_field(kind, "an order"));
        }
        Ok(())
    }

    fn reject_status(&self, kind: EntityKind) -> Result<(), CliError> {
        if self.status.is_some() {
            return Err(unsupported_field(kind, "a status"));
        }
        Ok(())
    }

    fn reject_description(&self, kind: EntityKind) -> Result<(), CliError> {
        if self.description.is_some() {
            return Err(unsupported_field(kind, "a description"));
        }
        Ok(())
    }
}

fn unsupported_field(kind: EntityKind, field: &str) -> CliError {
    CliError::InvalidEdit(format!("A {} has no {field} to edit", kind.label()))
}

/// Applies an [`EntityEdit`], rejecting fields the entity does not have.
pub trait Editable: Describe {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError>;
}

impl Editable for Story {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_order(Self::KIND)?;
        edit.reject_status(Self::KIND)?;
        if let Some(title) = edit.name()? {
            self.title = title;
        }
        if let Some(description) = &edit.description {
            self.description.clone_from(description);
        }
        Ok(())
    }
}

impl Editable for Character {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_order(Self::KIND)?;
        edit.reject_status(Self::KIND)?;
        if let Some(name) = edit.name()? {
            self.name = name;
        }
        if let Some(description) = &edit.description {
            self.description.clone_from(description);
        }
        Ok(())
    }
}

impl Editable for Location {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_order(Self::KIND)?;
        edit.reject_status(Self::KIND)?;
        if let Some(name) = edit.name()? {
            self.name = name;
        }
        if let Some(description) = &edit.description {
            self.description.clone_from(description);
        }
        Ok(())
    }
}

impl Editable for TimelineEvent {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_status(Self::KIND)?;
        if let Some(title) = edit.name()? {
            self.title = title;
        }
        if let Some(description) = &edit.description {
            self.description.clone_from(description);
        }
        if let Some(order) = edit.order {
            self.order = order;
        }
        Ok(())
    }
}

impl Editable for Relationship {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_order(Self::KIND)?;
        edit.reject_status(Self::KIND)?;
        if let Some(kind) = edit.name()? {
            self.kind = kind;
        }
        if let Some(description) = &edit.description {
            self.description.clone_from(description);
        }
        Ok(())
    }
}

impl Editable for LoreEntry {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_order(Self::KIND)?;
        edit.reject_status(Self::KIND)?;
        if let Some(title) = edit.name()? {
            self.title = title;
        }
        if let Some(content) = &edit.description {
            self.content.clone_from(content);
        }
        Ok(())
    }
}

impl Editable for IdeaGroup {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_description(Self::KIND)?;
        edit.reject_status(Self::KIND)?;
        if let Some(name) = edit.name()? {
            self.name = name;
        }
        if let Some(order) = edit.order {
            self.order = order;
        }
        Ok(())
    }
}

impl Editable for IdeaCard {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_status(Self::KIND)?;
        if let Some(title) = edit.name()? {
            self.title = title;
        }
        if let Some(content) = &edit.description {
            self.content.clone_from(content);
        }
        if let Some(order) = edit.order {
            self.order = order;
        }
        Ok(())
    }
}

impl Editable for Chapter {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        if let Some(title) = edit.name()? {
            self.title = title;
        }
        if let Some(summary) = &edit.description {
            self.summary.clone_from(summary);
        }
        if let Some(order) = edit.order {
            self.order = order;
        }
        if let Some(status) = edit.status {
            self.status = status;
        }
        Ok(())
    }
}

impl Editable for Tag {
    fn apply_edit(&mut self, edit: &EntityEdit) -> Result<(), CliError> {
        edit.reject_description(Self::KIND)?;
        edit.reject_order(Self::KIND)?;
        edit.reject_status(Self::KIND)?;
        if let Some(name) = edit.name()? {
            self.name = name.to_lowercase();
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct EntityListItem {
    pub id: String,
    pub kind: &'static str,
    pub story_id: Option<String>,
    pub label: String,
    pub detail: Option<String>,
}

pub fn entity_to_list_item<E: Describe>(entity: &E) -> EntityListItem {
    EntityListItem {
        id: entity.id().to_string(),
        kind: E::KIND.label(),
        story_id: entity.story_id().map(ToString::to_string),
        label: entity.label(),
        detail: entity.detail(),
    }
}

/// Stories are listed globally; everything else within one story.
pub fn list_items<E: Describe>(
    store: &LocalStore,
    story_id: Option<&EntityId>,
) -> Result<Vec<EntityListItem>, CliError> {
    let entities = if E::KIND == EntityKind::Story {
        let mut stories = store.list::<E>();
        stories.sort_by_key(Describe::label);
        stories
    } else {
        let story_id = story_id.ok_or(CliError::StoryRequired(E::KIND.label()))?;
        store.list_by_story::<E>(story_id)
    };
    Ok(entities.iter().map(entity_to_list_item).collect())
}

pub fn format_entity_lines(items: &[EntityListItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let short = item.id.chars().take(SHORT_ID_CHARS).collect::<String>();
            match item.detail.as_deref() {
                Some(detail) => format!("{short:<13}  {:<40}  {detail}", item.label),
                None => format!("{short:<13}  {}", item.label),
            }
        })
        .collect()
}

/// Find one entity by exact id or unique id prefix.
pub fn resolve_entity<E: Describe>(store: &LocalStore, query: &str) -> Result<E, CliError> {
    resolve_among(query, E::KIND, || store.list::<E>(), |id| store.get::<E>(id))
}

/// Like [`resolve_entity`], but only within `story_id`.
pub fn resolve_in_story<E: Describe>(
    store: &LocalStore,
    story_id: &EntityId,
    query: &str,
) -> Result<E, CliError> {
    resolve_among(
        query,
        E::KIND,
        || store.list_by_story::<E>(story_id),
        |id| {
            store
                .get::<E>(id)
                .filter(|entity| entity.story_id() == Some(story_id))
        },
    )
}

fn resolve_among<E: Describe>(
    query: &str,
    kind: EntityKind,
    candidates: impl FnOnce() -> Vec<E>,
    exact: impl FnOnce(&EntityId) -> Option<E>,
) -> Result<E, CliError> {
    let query = normalize_entity_identifier(query)?;
    if let Some(entity) = exact(&EntityId::from(query.as_str())) {
        return Ok(entity);
    }

    let mut matching: Vec<E> = candidates()
        .into_iter()
        .filter(|entity| entity.id().as_str().starts_with(&query))
        .collect();

    match matching.len() {
        0 => Err(CliError::EntityNotFound {
            kind: kind.label(),
            query,
        }),
        1 => Ok(matching.remove(0)),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|entity| short_id(entity.id()))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousEntityId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// One past the highest `order` in the story, or 0 for the first element.
pub fn next_order<E: Entity>(store: &LocalStore, story_id: &EntityId) -> i64 {
    store
        .list_by_story::<E>(story_id)
        .iter()
        .filter_map(Entity::sort_order)
        .max()
        .map_or(0, |order| order + 1)
}

pub fn short_id(id: &EntityId) -> String {
    id.as_str().chars().take(SHORT_ID_CHARS).collect()
}

pub fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_required_text(value: &str, field: &'static str) -> Result<String, CliError> {
    normalize_text(value).ok_or(CliError::EmptyText(field))
}

pub fn normalize_entity_identifier(id: &str) -> Result<String, CliError> {
    normalize_text(id).ok_or(CliError::EmptyEntityId)
}

pub fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || "never".to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn resolve_data_dir(cli_data_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) = cli_data_dir.or_else(|| env::var_os("PLOTLINE_DATA_DIR").map(PathBuf::from))
    {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("plotline"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

/// Profile URL first, then `PLOTLINE_API_URL`, then the local default.
pub fn session_options(
    profile: Option<&str>,
    data_dir: Option<PathBuf>,
) -> Result<SessionOptions, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let api = match config
        .profile(&profile_name)
        .and_then(crate::config_profiles::CliProfile::api_base_url)
    {
        Some(url) => ClientConfig::new(url)?,
        None => ClientConfig::from_lookup(|name| env::var(name).ok())?,
    };

    Ok(SessionOptions {
        profile_name,
        api,
        data_dir: resolve_data_dir(data_dir)?,
        settings: SyncSettings::from_env()?,
    })
}

pub async fn open_session(options: &SessionOptions) -> Result<CliSession, CliError> {
    let session = CliSession::open(options)?;
    session.start().await?;
    Ok(session)
}

/// The `snake_case` wire name of a serde enum, for plain-text output.
pub fn serde_label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(label)) => label,
        Ok(other) => other.to_string(),
        Err(_) => "unknown".to_string(),
    }
}

pub fn describe_push_outcome(outcome: PushOutcome) -> String {
    match outcome {
        PushOutcome::Pushed => "uploaded to server".to_string(),
        PushOutcome::SavedToScratch => "saved locally (signed out)".to_string(),
        PushOutcome::Beaconed => "handed off for upload".to_string(),
        PushOutcome::Skipped(reason) => format!("skipped ({})", serde_label(&reason)),
        PushOutcome::Failed => "failed".to_string(),
    }
}

pub fn format_report_lines(report: &SyncReport, api_base_url: &str) -> Vec<String> {
    let user = report
        .user
        .as_ref()
        .map_or_else(|| "(signed out)".to_string(), |user| user.label().to_string());
    vec![
        format!("User:        {user}"),
        format!("Server:      {api_base_url}"),
        format!("Phase:       {}", serde_label(&report.phase)),
        format!("Status:      {}", serde_label(&report.status)),
        format!("Reconciled:  {}", report.reconciled),
        format!("Last pull:   {}", format_timestamp(report.last_pull_at)),
        format!("Last push:   {}", format_timestamp(report.last_push_at)),
        format!("Failures:    {}", report.consecutive_failures),
    ]
}
