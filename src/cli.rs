//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use mdownloader_core::config::{DEFAULT_CHAPTER_DELAY, DEFAULT_OUTPUT_DIR, DEFAULT_TITLE_DELAY};
use mdownloader_core::languages::DEFAULT_LANGUAGE;
use mdownloader_core::{ArchiveFormat, ChapterRange, CompareMode, DEFAULT_API_URL, UnitKind};

/// Download manga titles and chapters as zip/cbz archives.
///
/// Each ID is a title or chapter number, or a path to a text file listing
/// one ID per line.
#[derive(Parser, Debug)]
#[command(name = "mdownloader")]
#[command(author, version, about)]
pub struct Args {
    /// Title or chapter IDs, or files of IDs
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Whether the IDs refer to titles or single chapters
    #[arg(long = "type", value_enum, default_value_t = IdKind::Title)]
    pub kind: IdKind,

    /// Language code chapters are filtered by
    #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
    pub language: String,

    /// Directory series folders are created in
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub directory: PathBuf,

    /// How existing pages are detected: names, data or skip
    #[arg(short = 'c', long, default_value = "names")]
    pub check_images: CompareMode,

    /// Archive format: zip or cbz
    #[arg(short, long, default_value = "cbz")]
    pub save_format: ArchiveFormat,

    /// Keep the loose page folder next to the archive
    #[arg(short, long)]
    pub keep_folder: bool,

    /// Chapters to download, e.g. "1-5, 7, !3" (titles only)
    #[arg(long)]
    pub range: Option<ChapterRange>,

    /// Seconds to wait between chapters
    #[arg(long, default_value_t = DEFAULT_CHAPTER_DELAY.as_secs())]
    pub chapter_delay: u64,

    /// Seconds to wait between titles
    #[arg(long, default_value_t = DEFAULT_TITLE_DELAY.as_secs())]
    pub title_delay: u64,

    /// Metadata API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// What the positional IDs refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdKind {
    /// Whole titles
    Title,
    /// Single chapters
    Chapter,
}

impl From<IdKind> for UnitKind {
    fn from(kind: IdKind) -> Self {
        match kind {
            IdKind::Title => UnitKind::Title,
            IdKind::Chapter => UnitKind::Chapter,
        }
    }
}
