//! Chapter model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};

/// Writing progress of a chapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    #[default]
    Planned,
    Drafting,
    Revising,
    Done,
}

impl ChapterStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Drafting => "drafting",
            Self::Revising => "revising",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for ChapterStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChapterStatus {
    type Err = crate::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(Self::Planned),
            "drafting" => Ok(Self::Drafting),
            "revising" => Ok(Self::Revising),
            "done" => Ok(Self::Done),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown chapter status '{other}'"
            ))),
        }
    }
}

/// A chapter outline entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: EntityId,
    pub story_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: ChapterStatus,
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    #[must_use]
    pub fn new(story_id: EntityId, title: impl Into<String>, order: i64) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(),
            story_id,
            title: title.into(),
            summary: String::new(),
            status: ChapterStatus::default(),
            order,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Chapter {
    const KIND: EntityKind = EntityKind::Chapter;

    entity_basics!(chapters);

    fn story_id(&self) -> Option<&EntityId> {
        Some(&self.story_id)
    }

    fn sort_order(&self) -> Option<i64> {
        Some(self.order)
    }
}
