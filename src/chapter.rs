//! Per-chapter orchestration: names → prior state → fetch → archive →
//! cleanup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::archive::{ArchiveError, ChapterWorkspace, inspect};
use crate::config::{CompareMode, DownloadOptions};
use crate::download::{FetchCoordinator, FetchOutcome, PageFetcher, PageRef, RetryPolicy};
use crate::metadata::ChapterMetadata;
use crate::naming::{self, VolumePrefixTable};

/// Chapter-level failures. Page failures never surface here; they are
/// recorded in [`ChapterResult::outcomes`].
#[derive(Debug, Error)]
pub enum ChapterError {
    /// The existing archive was corrupt (and has been removed), or the
    /// folder/archive could not be written.
    #[error("chapter {chapter_id}: {source}")]
    Archive {
        /// Chapter identifier.
        chapter_id: u64,
        /// Underlying archive error.
        #[source]
        source: ArchiveError,
    },

    /// File system error outside the archive itself.
    #[error("chapter {chapter_id}: IO error at {path}: {source}")]
    Io {
        /// Chapter identifier.
        chapter_id: u64,
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The chapter record lists no pages.
    #[error("chapter {chapter_id} has no pages")]
    NoPages {
        /// Chapter identifier.
        chapter_id: u64,
    },
}

impl ChapterError {
    /// Creates an archive error for `chapter_id`.
    pub fn archive(chapter_id: u64, source: ArchiveError) -> Self {
        Self::Archive { chapter_id, source }
    }

    /// Creates an IO error for `chapter_id`.
    pub fn io(chapter_id: u64, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            chapter_id,
            path: path.into(),
            source,
        }
    }
}

/// Overall result of one chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    /// Every page succeeded.
    Complete,
    /// At least one page failed; the archive holds the rest.
    PartiallyFailed,
    /// An archive already existed and the skip policy was in effect.
    Skipped,
}

/// Structured per-chapter report, handed to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterResult {
    /// Chapter identifier.
    pub chapter_id: u64,
    /// Volume label.
    pub volume: String,
    /// Chapter number.
    pub chapter: String,
    /// Group names.
    pub groups: Vec<String>,
    /// One outcome per page, in page order. Empty when skipped.
    pub outcomes: Vec<FetchOutcome>,
    /// Archive written, or the existing archive when skipped. `None` when no
    /// page could be stored.
    pub archive_path: Option<PathBuf>,
    /// Aggregate status.
    pub overall: ChapterStatus,
}

impl ChapterResult {
    /// Number of failed pages.
    #[must_use]
    pub fn failed_pages(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

/// Everything that identifies one chapter to assemble.
#[derive(Debug, Clone, Copy)]
pub struct ChapterJob<'a> {
    /// Chapter metadata.
    pub meta: &'a ChapterMetadata,
    /// Raw title of the series.
    pub title: &'a str,
    /// Prefix table of the series.
    pub prefixes: &'a VolumePrefixTable,
    /// Display name of the chapter's language.
    pub language_name: &'a str,
    /// Series directory the folder and archive live in.
    pub series_dir: &'a Path,
}

/// Drives one chapter from metadata to a finished archive.
pub struct ChapterAssembler<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    policy: RetryPolicy,
    options: &'a DownloadOptions,
    progress: Option<ProgressBar>,
}

impl<'a, F: PageFetcher + ?Sized> ChapterAssembler<'a, F> {
    /// Creates an assembler.
    #[must_use]
    pub fn new(fetcher: &'a F, policy: RetryPolicy, options: &'a DownloadOptions) -> Self {
        Self {
            fetcher,
            policy,
            options,
            progress: None,
        }
    }

    /// Attaches an advisory page progress bar.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Processes one chapter.
    ///
    /// # Errors
    ///
    /// Returns [`ChapterError`] for chapter-level failures: a corrupt
    /// existing archive (removed before returning), an unwritable target, or
    /// an empty page list. Failed pages are reported in the result instead.
    #[instrument(skip(self, job), fields(chapter_id = job.meta.id, chapter = %job.meta.chapter))]
    pub async fn process(&self, job: ChapterJob<'_>) -> Result<ChapterResult, ChapterError> {
        let meta = job.meta;
        let chapter_id = meta.id;
        if meta.pages.is_empty() {
            return Err(ChapterError::NoPages { chapter_id });
        }

        let names = naming::resolve(
            meta,
            job.title,
            job.prefixes,
            job.language_name,
            self.options.archive_format,
        );
        fs::create_dir_all(job.series_dir)
            .map_err(|e| ChapterError::io(chapter_id, job.series_dir, e))?;
        let folder = job.series_dir.join(&names.folder_name);
        let archive_path = job.series_dir.join(&names.archive_file_name);

        let prior = inspect(&folder, &archive_path)
            .map_err(|e| ChapterError::archive(chapter_id, e))?;

        let mode = self.options.compare_mode;
        if mode == CompareMode::SkipIfArchiveExists && prior.has_archive() {
            if prior.has_folder() {
                fs::remove_dir_all(&folder).map_err(|e| ChapterError::io(chapter_id, &folder, e))?;
            }
            info!(archive = %archive_path.display(), "archive exists, skipping chapter");
            return Ok(ChapterResult {
                chapter_id,
                volume: meta.volume.clone(),
                chapter: meta.chapter.clone(),
                groups: meta.groups.clone(),
                outcomes: Vec::new(),
                archive_path: Some(archive_path),
                overall: ChapterStatus::Skipped,
            });
        }

        let workspace = ChapterWorkspace::open(prior, &folder, &archive_path, mode)
            .map_err(|e| ChapterError::archive(chapter_id, e))?;

        let pages: Vec<PageRef> = meta
            .pages
            .iter()
            .zip(names.page_file_names(&meta.pages))
            .map(|(remote, file_name)| PageRef {
                remote_name: remote.clone(),
                file_name,
            })
            .collect();

        let mut coordinator = FetchCoordinator::new(self.fetcher, self.policy.clone());
        if let Some(progress) = &self.progress {
            coordinator = coordinator.with_progress(progress.clone());
        }
        let (workspace, outcomes) = coordinator
            .fetch_chapter(&meta.page_base_url(), &pages, workspace)
            .await;
        let new_writes = workspace.new_writes();

        let archive_path = workspace
            .finish()
            .map_err(|e| ChapterError::archive(chapter_id, e))?;

        if !self.options.keep_loose_folder && folder.exists() {
            fs::remove_dir_all(&folder).map_err(|e| ChapterError::io(chapter_id, &folder, e))?;
        }

        let overall = if outcomes.iter().all(FetchOutcome::is_success) {
            ChapterStatus::Complete
        } else {
            ChapterStatus::PartiallyFailed
        };
        let result = ChapterResult {
            chapter_id,
            volume: meta.volume.clone(),
            chapter: meta.chapter.clone(),
            groups: meta.groups.clone(),
            outcomes,
            archive_path,
            overall,
        };
        if overall == ChapterStatus::Complete {
            info!(new_writes, "chapter complete");
        } else {
            warn!(
                failed = result.failed_pages(),
                new_writes, "chapter finished with failed pages"
            );
        }
        Ok(result)
    }
}
