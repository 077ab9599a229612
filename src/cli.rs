use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::formats::{Difficulty, HeadingLevel};
use crate::generation::{
    ContentLength, ContentStyle, ContentTone, KeywordStrategy, OutlineStyle,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Data directory for cached search results and flow state.
    /// Defaults to `$BLOGFLOW_DATA_DIR`, then `.blogflow`.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Outline {
        #[command(subcommand)]
        command: OutlineCommand,
    },
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    Search(SearchArgs),
    Topics(TopicsArgs),
    Content(ContentArgs),
    Elaborate(ElaborateArgs),
}

#[derive(Debug, Subcommand)]
pub enum OutlineCommand {
    /// Print an outline as markdown (or JSON).
    Show(OutlineShowArgs),
    /// Insert a new section at the top level or under a parent.
    Add(OutlineAddArgs),
    /// Delete a section and its subtree.
    Remove(OutlineRemoveArgs),
    /// Overwrite fields of one section.
    Update(OutlineUpdateArgs),
    /// Move a section within its sibling list.
    Reorder(OutlineReorderArgs),
    /// Generate an outline for a topic with the language model.
    Generate(OutlineGenerateArgs),
    /// Rework an outline from free-form instructions with the language model.
    Customize(OutlineCustomizeArgs),
}

#[derive(Debug, Args)]
pub struct OutlineFileArgs {
    /// Outline JSON file (edited in place).
    #[arg(long)]
    pub file: PathBuf,

    /// Fail when the named section or parent does not exist instead of leaving the outline as-is.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct OutlineShowArgs {
    /// Outline JSON file.
    #[arg(long)]
    pub file: PathBuf,

    /// Print the outline JSON instead of markdown.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct OutlineAddArgs {
    #[command(flatten)]
    pub target: OutlineFileArgs,

    /// Parent section id (default: append at the top level).
    #[arg(long)]
    pub parent: Option<String>,

    /// Section title.
    #[arg(long)]
    pub title: String,

    /// Heading level (default: one below the parent, or h2).
    #[arg(long, value_enum)]
    pub level: Option<HeadingLevel>,

    /// Section summary.
    #[arg(long)]
    pub content: Option<String>,

    /// Recommended word count.
    #[arg(long)]
    pub words: Option<u32>,
}

#[derive(Debug, Args)]
pub struct OutlineRemoveArgs {
    #[command(flatten)]
    pub target: OutlineFileArgs,

    /// Section id.
    #[arg(long)]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct OutlineUpdateArgs {
    #[command(flatten)]
    pub target: OutlineFileArgs,

    /// Section id.
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, value_enum)]
    pub level: Option<HeadingLevel>,

    #[arg(long)]
    pub content: Option<String>,

    /// Recommended word count.
    #[arg(long)]
    pub words: Option<u32>,

    /// Key point (repeatable; replaces the existing list).
    #[arg(long = "key-point")]
    pub key_points: Vec<String>,
}

#[derive(Debug, Args)]
pub struct OutlineReorderArgs {
    #[command(flatten)]
    pub target: OutlineFileArgs,

    /// Section id.
    #[arg(long)]
    pub id: String,

    /// Destination index among the section's siblings (clamped).
    #[arg(long)]
    pub index: usize,
}

#[derive(Debug, Args)]
pub struct OutlineGenerateArgs {
    /// Topic JSON file (one `TopicIdea`, e.g. from `topics`).
    #[arg(long)]
    pub topic: PathBuf,

    /// Output outline JSON file.
    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, value_enum)]
    pub style: Option<OutlineStyle>,

    /// Maximum nesting depth (1-4).
    #[arg(long)]
    pub depth: Option<u8>,

    #[arg(long, value_enum)]
    pub keyword_strategy: Option<KeywordStrategy>,

    /// Leave out the introduction and conclusion.
    #[arg(long)]
    pub no_intro_conclusion: bool,

    /// Leave out the FAQ section.
    #[arg(long)]
    pub no_faq: bool,
}

#[derive(Debug, Args)]
pub struct OutlineCustomizeArgs {
    /// Outline JSON file (rewritten in place).
    #[arg(long)]
    pub file: PathBuf,

    /// What to change, in plain words.
    #[arg(long)]
    pub instruction: String,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print entry counts and age range for the current partition.
    Stats(CacheArgs),
    /// Remove every entry in the current partition.
    Clear(CacheArgs),
    /// Remove entries older than the configured expiry.
    ClearExpired(CacheArgs),
}

#[derive(Debug, Args)]
pub struct CacheArgs {
    /// YAML file with cache settings (camelCase keys; missing keys use defaults).
    #[arg(long)]
    pub cache_config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search query.
    pub query: String,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Two-letter country code.
    #[arg(long)]
    pub country: Option<String>,

    /// Two-letter language code.
    #[arg(long)]
    pub language: Option<String>,

    /// Restrict to results from one site.
    #[arg(long)]
    pub site: Option<String>,
}

#[derive(Debug, Args)]
pub struct TopicsArgs {
    /// Main topic every suggestion must relate to.
    #[arg(long)]
    pub main_topic: String,

    #[arg(long)]
    pub niche: Option<String>,

    #[arg(long)]
    pub audience: Option<String>,

    #[arg(long, value_enum)]
    pub length: Option<ContentLength>,

    #[arg(long, value_enum)]
    pub difficulty: Option<Difficulty>,

    /// Enrich topics with live search results.
    #[arg(long)]
    pub serp: bool,

    /// Write topics JSON here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ContentArgs {
    /// Outline JSON file.
    #[arg(long)]
    pub outline: PathBuf,

    /// Only write this section.
    #[arg(long)]
    pub section: Option<String>,

    #[arg(long, value_enum)]
    pub style: Option<ContentStyle>,

    #[arg(long, value_enum)]
    pub tone: Option<ContentTone>,

    #[arg(long, value_enum)]
    pub readability: Option<Difficulty>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Output content JSON file.
    #[arg(long)]
    pub out: PathBuf,

    /// Also write the article as markdown.
    #[arg(long)]
    pub markdown: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ElaborateArgs {
    /// What to expand and how.
    #[arg(long)]
    pub prompt: String,

    /// Markdown file with the section to expand.
    #[arg(long)]
    pub original: Option<PathBuf>,

    #[arg(long)]
    pub target_words: Option<u32>,
}
