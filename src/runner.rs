//! Sequential orchestration over titles and chapters.
//!
//! One unit (a title or a single chapter) is processed at a time and one
//! chapter at a time within a title, with fixed pauses in between. Only the
//! pages of the chapter in hand are fetched concurrently.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::api::{ApiClient, ApiError, ChapterRecord, ChapterSummary};
use crate::chapter::{ChapterAssembler, ChapterJob, ChapterResult, ChapterStatus};
use crate::config::DownloadOptions;
use crate::download::RetryPolicy;
use crate::languages;
use crate::ledger::{LedgerError, TitleLedger};
use crate::naming::{self, VolumePrefixTable};
use crate::selection::{ChapterRange, filter_language};

/// Public page of a title on the service, recorded in the ledger.
pub const TITLE_LINK_BASE: &str = "https://mangadex.org/title/";

/// Unit-level failures. Chapter failures inside a title are counted in the
/// [`RunSummary`] instead.
#[derive(Debug, Error)]
pub enum RunError {
    /// The title or chapter record could not be fetched.
    #[error(transparent)]
    Api(ApiError),

    /// The ledger could not be loaded or saved.
    #[error(transparent)]
    Ledger(LedgerError),

    /// An ID file could not be read.
    #[error("cannot read ID file {path}: {source}")]
    IdFile {
        /// Path of the file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// An input is neither a numeric ID nor an existing file.
    #[error("invalid ID {value:?}")]
    InvalidId {
        /// The offending input.
        value: String,
    },
}

/// What the IDs of a run refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitKind {
    /// Whole titles.
    #[default]
    Title,
    /// Single chapters.
    Chapter,
}

/// Counts gathered over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Chapters with every page stored.
    pub complete: usize,
    /// Chapters with failed pages.
    pub partial: usize,
    /// Chapters skipped because their archive existed.
    pub skipped: usize,
    /// Chapters that failed before or while assembling.
    pub failed: usize,
    /// Chapters left out because the ledger already lists them.
    pub already_done: usize,
    /// Titles or chapters whose record could not be fetched.
    pub units_failed: usize,
}

impl RunSummary {
    /// Returns true if anything needs another run.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.partial + self.failed + self.units_failed > 0
    }

    fn record(&mut self, status: ChapterStatus) {
        match status {
            ChapterStatus::Complete => self.complete += 1,
            ChapterStatus::PartiallyFailed => self.partial += 1,
            ChapterStatus::Skipped => self.skipped += 1,
        }
    }

    fn merge(&mut self, other: Self) {
        self.complete += other.complete;
        self.partial += other.partial;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.already_done += other.already_done;
        self.units_failed += other.units_failed;
    }
}

/// Expands inputs into IDs: numeric inputs are taken as-is, anything else is
/// read as a file with one ID per line. Blank lines are ignored.
///
/// # Errors
///
/// Returns [`RunError::IdFile`] if a file cannot be read and
/// [`RunError::InvalidId`] for a value that is not a number.
pub fn collect_ids(inputs: &[String]) -> Result<Vec<u64>, RunError> {
    let mut ids = Vec::new();
    for input in inputs {
        let input = input.trim();
        if let Ok(id) = input.parse::<u64>() {
            ids.push(id);
            continue;
        }
        let path = Path::new(input);
        if !path.is_file() {
            return Err(RunError::InvalidId {
                value: input.to_string(),
            });
        }
        let contents = fs::read_to_string(path).map_err(|source| RunError::IdFile {
            path: path.to_path_buf(),
            source,
        })?;
        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let id = line.parse::<u64>().map_err(|_| RunError::InvalidId {
                value: line.to_string(),
            })?;
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Runs titles and chapters through the assembler.
pub struct Runner {
    api: ApiClient,
    options: DownloadOptions,
    policy: RetryPolicy,
    progress: Option<ProgressBar>,
}

impl Runner {
    /// Creates a runner.
    #[must_use]
    pub fn new(api: ApiClient, options: DownloadOptions, policy: RetryPolicy) -> Self {
        Self {
            api,
            options,
            policy,
            progress: None,
        }
    }

    /// Attaches an advisory page progress bar.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Processes every ID in order, pausing between units. Unit failures are
    /// logged and counted; the run continues with the next ID.
    pub async fn run_all(
        &self,
        kind: UnitKind,
        ids: &[u64],
        range: Option<&ChapterRange>,
    ) -> RunSummary {
        let delay = match kind {
            UnitKind::Title => self.options.title_delay,
            UnitKind::Chapter => self.options.chapter_delay,
        };
        let mut summary = RunSummary::default();
        for (index, &id) in ids.iter().enumerate() {
            if index > 0 {
                pause(delay).await;
            }
            let result = match kind {
                UnitKind::Title => self.run_title(id, range).await,
                UnitKind::Chapter => self.run_chapter(id).await,
            };
            match result {
                Ok(unit) => summary.merge(unit),
                Err(e) => {
                    error!(id, error = %e, "unit failed");
                    summary.units_failed += 1;
                }
            }
        }
        summary
    }

    /// Downloads the chapters of one title in the configured language.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the title record cannot be fetched or the
    /// ledger cannot be read or written.
    #[instrument(skip(self, range))]
    pub async fn run_title(
        &self,
        title_id: u64,
        range: Option<&ChapterRange>,
    ) -> Result<RunSummary, RunError> {
        let title = self.api.fetch_title(title_id).await.map_err(RunError::Api)?;
        let language = self.options.language.as_str();

        let chapters = filter_language(title.chapters, language);
        let prefixes =
            naming::assign_prefixes(chapters.iter().map(|c| (c.volume.as_str(), c.chapter.as_str())));
        let chapters = match range {
            Some(range) => range.apply(chapters),
            None => chapters,
        };

        let series_dir = self
            .options
            .output_dir
            .join(naming::series_folder_name(&title.title, title.is_hentai));
        let mut ledger = TitleLedger::load(
            &series_dir,
            title_id,
            &title.title,
            language,
            &format!("{TITLE_LINK_BASE}{title_id}"),
        )
        .map_err(RunError::Ledger)?;

        let done = ledger.already_processed();
        let (pending, known): (Vec<ChapterSummary>, Vec<ChapterSummary>) =
            chapters.into_iter().partition(|c| !done.contains(&c.id));
        info!(
            title = %title.title,
            chapters = pending.len(),
            already_done = known.len(),
            "downloading title"
        );

        let mut summary = RunSummary {
            already_done: known.len(),
            ..RunSummary::default()
        };
        let language_name = languages::display_name(language);
        for (index, chapter) in pending.iter().enumerate() {
            if index > 0 {
                pause(self.options.chapter_delay).await;
            }
            let outcome = match self.api.fetch_chapter(chapter.id).await {
                Ok(record) => {
                    self.assemble(&record, &title.title, &prefixes, language_name, &series_dir)
                        .await
                }
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(result) => {
                    summary.record(result.overall);
                    ledger.record_processed(&result);
                }
                Err(message) => {
                    warn!(chapter_id = chapter.id, error = %message, "chapter failed");
                    summary.failed += 1;
                    ledger.record_failure(chapter.id, &chapter.chapter, &chapter.volume, &message);
                }
            }
            ledger.save().map_err(RunError::Ledger)?;
        }
        Ok(summary)
    }

    /// Downloads a single chapter into its title's series folder.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the chapter record cannot be fetched or the
    /// ledger cannot be read or written.
    #[instrument(skip(self))]
    pub async fn run_chapter(&self, chapter_id: u64) -> Result<RunSummary, RunError> {
        let record = self
            .api
            .fetch_chapter(chapter_id)
            .await
            .map_err(RunError::Api)?;
        let meta = &record.metadata;
        let series_dir = self
            .options
            .output_dir
            .join(naming::series_folder_name(&record.manga_title, false));
        let mut ledger = TitleLedger::load(
            &series_dir,
            meta.manga_id,
            &record.manga_title,
            &meta.language,
            &format!("{TITLE_LINK_BASE}{}", meta.manga_id),
        )
        .map_err(RunError::Ledger)?;

        let mut summary = RunSummary::default();
        let prefixes = VolumePrefixTable::default();
        let language_name = languages::display_name(&meta.language);
        match self
            .assemble(&record, &record.manga_title, &prefixes, language_name, &series_dir)
            .await
        {
            Ok(result) => {
                summary.record(result.overall);
                ledger.record_processed(&result);
            }
            Err(message) => {
                warn!(chapter_id, error = %message, "chapter failed");
                summary.failed += 1;
                ledger.record_failure(chapter_id, &meta.chapter, &meta.volume, &message);
            }
        }
        ledger.save().map_err(RunError::Ledger)?;
        Ok(summary)
    }

    async fn assemble(
        &self,
        record: &ChapterRecord,
        title: &str,
        prefixes: &VolumePrefixTable,
        language_name: &str,
        series_dir: &Path,
    ) -> Result<ChapterResult, String> {
        let mut assembler =
            ChapterAssembler::new(self.api.http(), self.policy.clone(), &self.options);
        if let Some(progress) = &self.progress {
            assembler = assembler.with_progress(progress.clone());
        }
        assembler
            .process(ChapterJob {
                meta: &record.metadata,
                title,
                prefixes,
                language_name,
                series_dir,
            })
            .await
            .map_err(|e| e.to_string())
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
