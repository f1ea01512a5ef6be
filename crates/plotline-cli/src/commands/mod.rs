/// Run a generic entity helper with the model type matching `$kind`.
macro_rules! dispatch_kind {
    ($kind:expr, $func:ident($($arg:expr),* $(,)?)) => {{
        use plotline_core::models::{
            Chapter, Character, IdeaCard, IdeaGroup, Location, LoreEntry, Relationship, Story,
            Tag, TimelineEvent,
        };
        match $kind {
            plotline_core::EntityKind::Story => $func::<Story>($($arg),*),
            plotline_core::EntityKind::Character => $func::<Character>($($arg),*),
            plotline_core::EntityKind::Location => $func::<Location>($($arg),*),
            plotline_core::EntityKind::Event => $func::<TimelineEvent>($($arg),*),
            plotline_core::EntityKind::Relationship => $func::<Relationship>($($arg),*),
            plotline_core::EntityKind::LoreEntry => $func::<LoreEntry>($($arg),*),
            plotline_core::EntityKind::IdeaGroup => $func::<IdeaGroup>($($arg),*),
            plotline_core::EntityKind::IdeaCard => $func::<IdeaCard>($($arg),*),
            plotline_core::EntityKind::Chapter => $func::<Chapter>($($arg),*),
            plotline_core::EntityKind::Tag => $func::<Tag>($($arg),*),
        }
    }};
}

pub mod add;
pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod edit;
pub mod export;
pub mod list;
pub mod show;
pub mod sync;
