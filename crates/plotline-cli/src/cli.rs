use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use plotline_core::models::ChapterStatus;
use plotline_core::EntityKind;

#[derive(Parser)]
#[command(name = "plotline")]
#[command(about = "Plan stories from the command line, synced with your Plotline account")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional directory for local data (scratch copy while signed out)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// CLI profile name for server and session configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a story or a story element
    #[command(alias = "new")]
    Add {
        #[command(subcommand)]
        entity: AddCommands,
    },
    /// List stories, or the elements of one story
    List {
        /// What to list
        #[arg(value_enum, default_value_t = EntityArg::Story)]
        kind: EntityArg,
        /// Story ID or unique ID prefix (required for everything but stories)
        #[arg(short, long, value_name = "STORY")]
        story: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a story outline with element counts
    Show {
        /// Story ID or unique ID prefix
        story: String,
    },
    /// Change fields of an existing entity
    Edit(EditArgs),
    /// Delete an entity and everything that depends on it
    Delete {
        #[arg(value_enum)]
        kind: EntityArg,
        /// Entity ID or unique ID prefix
        id: String,
    },
    /// Export all stories, or one story
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Story ID or unique ID prefix to limit the export to
        #[arg(short, long, value_name = "STORY")]
        story: Option<String>,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Reconcile with the server and upload pending changes
    Sync {
        /// Output the sync report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in, register or sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum EntityArg {
    Story,
    Character,
    Location,
    Event,
    Relationship,
    Lore,
    IdeaGroup,
    IdeaCard,
    Chapter,
    Tag,
}

impl From<EntityArg> for EntityKind {
    fn from(value: EntityArg) -> Self {
        match value {
            EntityArg::Story => Self::Story,
            EntityArg::Character => Self::Character,
            EntityArg::Location => Self::Location,
            EntityArg::Event => Self::Event,
            EntityArg::Relationship => Self::Relationship,
            EntityArg::Lore => Self::LoreEntry,
            EntityArg::IdeaGroup => Self::IdeaGroup,
            EntityArg::IdeaCard => Self::IdeaCard,
            EntityArg::Chapter => Self::Chapter,
            EntityArg::Tag => Self::Tag,
        }
    }
}

#[derive(Subcommand)]
pub enum AddCommands {
    /// Start a new story
    Story {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        genre: Option<String>,
    },
    /// Add a character to a story
    Character {
        /// Story ID or unique ID prefix
        story: String,
        name: String,
        /// Narrative role, e.g. "protagonist"
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add a location to a story
    Location {
        story: String,
        name: String,
        /// Enclosing location ID or prefix
        #[arg(long, value_name = "LOCATION")]
        parent: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add a timeline event to a story
    Event {
        story: String,
        title: String,
        /// Position on the timeline (appended when omitted)
        #[arg(long)]
        order: Option<i64>,
        #[arg(long, value_name = "CHAPTER")]
        chapter: Option<String>,
        #[arg(long, value_name = "LOCATION")]
        location: Option<String>,
        /// Characters involved (repeatable)
        #[arg(long = "character", value_name = "CHARACTER")]
        characters: Vec<String>,
    },
    /// Relate two characters of a story
    Relationship {
        story: String,
        /// Source character ID or prefix
        source: String,
        /// Target character ID or prefix
        target: String,
        /// Label such as "sibling" or "rival"
        kind: String,
    },
    /// Add a lore entry to a story
    Lore {
        story: String,
        title: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Add an idea group to a story
    IdeaGroup {
        story: String,
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Add an idea card to a story
    IdeaCard {
        story: String,
        title: String,
        /// Idea group ID or prefix
        #[arg(long, value_name = "GROUP")]
        group: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Add a chapter to a story
    Chapter {
        story: String,
        title: String,
        /// Position in the manuscript (appended when omitted)
        #[arg(long)]
        order: Option<i64>,
        #[arg(long, value_parser = parse_chapter_status)]
        status: Option<ChapterStatus>,
    },
    /// Add a tag to a story
    Tag {
        story: String,
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Args)]
pub struct EditArgs {
    #[arg(value_enum)]
    pub kind: EntityArg,
    /// Entity ID or unique ID prefix
    pub id: String,
    /// New title or name
    #[arg(long)]
    pub name: Option<String>,
    /// New description, summary or content
    #[arg(long)]
    pub description: Option<String>,
    /// New position for ordered elements
    #[arg(long)]
    pub order: Option<i64>,
    /// New chapter status
    #[arg(long, value_parser = parse_chapter_status)]
    pub status: Option<ChapterStatus>,
}

fn parse_chapter_status(value: &str) -> Result<ChapterStatus, String> {
    value.parse().map_err(|error: plotline_core::Error| error.to_string())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl From<ExportFormat> for plotline_core::export::ExportFormat {
    fn from(value: ExportFormat) -> Self {
        match value {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Plotline API base URL
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile configuration
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the session in the OS keychain
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account; local data is uploaded to it
    Register {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show who is signed in and the sync state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload pending changes, sign out and clear local data
    Logout,
}
