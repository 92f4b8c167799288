//! Executes reconciliation decisions against a chapter's folder and archive.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use super::{Action, ArchiveContents, ArchiveError, ChapterArchive, PriorState, reconcile};
use crate::config::CompareMode;

/// Working state for one chapter: the prior state, the loose folder, the
/// open archive and, in data mode, the scratch extraction of the old archive.
///
/// The scratch directory is deleted when the workspace is finished or
/// dropped.
#[derive(Debug)]
pub struct ChapterWorkspace {
    prior: PriorState,
    folder: PathBuf,
    archive: ChapterArchive,
    mode: CompareMode,
    scratch: Option<TempDir>,
    applied: BTreeSet<String>,
    new_writes: usize,
}

impl ChapterWorkspace {
    /// Prepares the folder and archive for writing.
    ///
    /// In data mode an existing archive is extracted to a scratch directory
    /// next to the folder so its entries can be compared byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the folder cannot be created, the archive
    /// cannot be opened, or extraction fails (the archive is then removed as
    /// corrupt).
    #[instrument(skip(prior), fields(folder = %folder.display()))]
    pub fn open(
        prior: PriorState,
        folder: &Path,
        archive_path: &Path,
        mode: CompareMode,
    ) -> Result<Self, ArchiveError> {
        let parent = folder.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(folder).map_err(|e| ArchiveError::io(folder, e))?;

        let (prior, scratch) = if mode == CompareMode::ByteContent && prior.has_archive() {
            let scratch = tempfile::Builder::new()
                .prefix(".extract-")
                .tempdir_in(parent)
                .map_err(|e| ArchiveError::io(parent, e))?;
            let prior = prior.extract_archive(archive_path, scratch.path())?;
            (prior, Some(scratch))
        } else {
            (prior, None)
        };

        let archive = ChapterArchive::open_for(&prior, archive_path, mode)?;
        Ok(Self {
            prior,
            folder: folder.to_path_buf(),
            archive,
            mode,
            scratch,
            applied: BTreeSet::new(),
            new_writes: 0,
        })
    }

    /// Reconciles one fetched page and performs the resulting action.
    ///
    /// A name is applied at most once per workspace. A second page under a
    /// name already applied is skipped, leaving the folder and the archive
    /// holding the same payload.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if a page cannot be written or copied.
    pub fn apply(&mut self, page_name: &str, bytes: &[u8]) -> Result<Action, ArchiveError> {
        if self.applied.contains(page_name) {
            warn!(page = page_name, "page name already stored this run, skipping");
            return Ok(Action::Skip);
        }
        let action = reconcile(&self.prior, page_name, bytes, self.mode)?;
        let page_path = self.folder.join(page_name);
        match action {
            Action::Skip => {}
            Action::WriteFolderAndArchive => {
                fs::write(&page_path, bytes).map_err(|e| ArchiveError::io(&page_path, e))?;
                self.archive.add_bytes(page_name, bytes)?;
                self.new_writes += 1;
            }
            Action::CopyFromArchiveToFolder => {
                if let Some(ArchiveContents::Extracted(scratch)) = self.prior.archive() {
                    let source = scratch.path_of(page_name);
                    fs::copy(&source, &page_path).map_err(|e| ArchiveError::io(&source, e))?;
                }
                self.archive.add_bytes(page_name, bytes)?;
            }
            Action::ArchiveFromFolder => {
                self.archive.add_file(page_name, &page_path)?;
            }
        }
        self.applied.insert(page_name.to_string());
        Ok(action)
    }

    /// Number of pages written from freshly fetched bytes.
    #[must_use]
    pub fn new_writes(&self) -> usize {
        self.new_writes
    }

    /// Loose folder path.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Closes the archive and removes the scratch extraction.
    ///
    /// When rebuilding, entries of the old archive that were not fetched
    /// again this run are carried over so a partial re-run never shrinks the
    /// archive. An archive that would end up with no entries is discarded
    /// and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if carrying entries over or closing fails.
    #[instrument(skip(self), fields(folder = %self.folder.display()))]
    pub fn finish(mut self) -> Result<Option<PathBuf>, ArchiveError> {
        if let Some(ArchiveContents::Extracted(scratch)) = self.prior.archive() {
            let mut carried = 0usize;
            for name in scratch.names() {
                if !self.archive.contains(name) {
                    self.archive.add_file(name, &scratch.path_of(name))?;
                    carried += 1;
                }
            }
            if carried > 0 {
                debug!(carried, "carried over entries from previous archive");
            }
        }
        let path = if self.archive.is_empty() {
            debug!("no pages stored, discarding empty archive");
            self.archive.discard();
            None
        } else {
            Some(self.archive.finish()?)
        };
        if let Some(scratch) = self.scratch.take() {
            let scratch_path = scratch.path().to_path_buf();
            scratch
                .close()
                .map_err(|e| ArchiveError::io(scratch_path, e))?;
        }
        Ok(path)
    }
}
