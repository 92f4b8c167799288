//! Per-title record of processed chapters, persisted as
//! `<series>/<title_id>_data.json`.
//!
//! The ledger lets a repeated run skip chapters that already finished.
//! Chapters that only partially succeeded are not treated as processed, so
//! they are attempted again next time.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::chapter::{ChapterResult, ChapterStatus};
use crate::download::FetchOutcome;
use crate::languages;

/// Errors loading or saving a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// File system error.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The existing ledger is not valid JSON of the expected shape.
    #[error("invalid ledger {path}: {source}")]
    Parse {
        /// Ledger path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl LedgerError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Status recorded for a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// All pages stored.
    Complete,
    /// Some pages failed.
    PartiallyFailed,
    /// Skipped because the archive already existed.
    Skipped,
    /// The chapter could not be processed at all.
    Failed,
}

impl EntryStatus {
    /// Returns true if the chapter needs no further work.
    #[must_use]
    pub fn is_done(self) -> bool {
        matches!(self, Self::Complete | Self::Skipped)
    }
}

impl From<ChapterStatus> for EntryStatus {
    fn from(status: ChapterStatus) -> Self {
        match status {
            ChapterStatus::Complete => Self::Complete,
            ChapterStatus::PartiallyFailed => Self::PartiallyFailed,
            ChapterStatus::Skipped => Self::Skipped,
        }
    }
}

/// One chapter in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Chapter identifier.
    pub id: u64,
    /// Chapter number.
    pub chapter: String,
    /// Volume label.
    pub volume: String,
    /// Group names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Final status.
    pub status: EntryStatus,
    /// Archive path, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
    /// Per-page outcomes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<FetchOutcome>,
    /// Chapter-level error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// On-disk document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDocument {
    /// Title identifier.
    pub id: u64,
    /// Title as reported upstream.
    pub title: String,
    /// Language code the chapters were filtered by.
    pub language: String,
    /// ISO-639-2 code of that language, `"NA"` if unknown.
    #[serde(default)]
    pub iso_language: String,
    /// Link to the title on the service.
    pub link: String,
    /// Chapters in the order they were recorded.
    pub chapters: Vec<LedgerEntry>,
}

/// A title's ledger bound to its file.
#[derive(Debug, Clone)]
pub struct TitleLedger {
    path: PathBuf,
    document: LedgerDocument,
}

impl TitleLedger {
    /// Path of the ledger for `title_id` inside `series_dir`.
    #[must_use]
    pub fn path_for(series_dir: &Path, title_id: u64) -> PathBuf {
        series_dir.join(format!("{title_id}_data.json"))
    }

    /// Loads the ledger if it exists, otherwise starts an empty one. The
    /// header fields are refreshed from the arguments either way.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if an existing file cannot be read or parsed.
    #[instrument(skip(title, link))]
    pub fn load(
        series_dir: &Path,
        title_id: u64,
        title: &str,
        language: &str,
        link: &str,
    ) -> Result<Self, LedgerError> {
        let path = Self::path_for(series_dir, title_id);
        let mut document = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<LedgerDocument>(&raw).map_err(|source| {
                LedgerError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => LedgerDocument {
                id: title_id,
                title: String::new(),
                language: String::new(),
                iso_language: String::new(),
                link: String::new(),
                chapters: Vec::new(),
            },
            Err(e) => return Err(LedgerError::io(&path, e)),
        };
        document.id = title_id;
        document.title = title.to_string();
        document.language = language.to_string();
        document.iso_language = languages::iso_code(language).to_string();
        document.link = link.to_string();
        debug!(path = %path.display(), chapters = document.chapters.len(), "ledger loaded");
        Ok(Self { path, document })
    }

    /// Ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document.
    #[must_use]
    pub fn document(&self) -> &LedgerDocument {
        &self.document
    }

    /// Chapters whose last recorded status is complete or skipped.
    #[must_use]
    pub fn already_processed(&self) -> BTreeSet<u64> {
        self.document
            .chapters
            .iter()
            .filter(|e| e.status.is_done())
            .map(|e| e.id)
            .collect()
    }

    /// Records a processed chapter, replacing any earlier entry for it.
    pub fn record_processed(&mut self, result: &ChapterResult) {
        self.upsert(LedgerEntry {
            id: result.chapter_id,
            chapter: result.chapter.clone(),
            volume: result.volume.clone(),
            groups: result.groups.clone(),
            status: result.overall.into(),
            archive: result.archive_path.clone(),
            pages: result.outcomes.clone(),
            error: None,
        });
    }

    /// Records a chapter that failed before producing a result.
    pub fn record_failure(&mut self, chapter_id: u64, chapter: &str, volume: &str, error: &str) {
        self.upsert(LedgerEntry {
            id: chapter_id,
            chapter: chapter.to_string(),
            volume: volume.to_string(),
            groups: Vec::new(),
            status: EntryStatus::Failed,
            archive: None,
            pages: Vec::new(),
            error: Some(error.to_string()),
        });
    }

    fn upsert(&mut self, entry: LedgerEntry) {
        match self.document.chapters.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.document.chapters.push(entry),
        }
    }

    /// Writes the ledger atomically: a temporary file in the same directory
    /// is renamed over the target.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the directory or file cannot be written.
    pub fn save(&self) -> Result<(), LedgerError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| LedgerError::io(dir, e))?;

        let json = serde_json::to_vec_pretty(&self.document).map_err(|source| {
            LedgerError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| LedgerError::io(dir, e))?;
        temp.write_all(&json)
            .map_err(|e| LedgerError::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| LedgerError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| LedgerError::io(&self.path, e.error))?;
        debug!(path = %self.path.display(), "ledger saved");
        Ok(())
    }
}
