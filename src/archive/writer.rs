//! Chapter archive writer.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{ArchiveContents, ArchiveError, PriorState};
use crate::config::CompareMode;

/// How the archive for a chapter is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// No archive exists: write a new one next to the target and rename.
    Create,
    /// Add entries to the existing archive in place.
    Append,
    /// Write a fresh archive next to the target and rename over the old one.
    Rebuild,
}

impl WriteStrategy {
    /// Picks the strategy for the given prior state and compare mode.
    #[must_use]
    pub fn for_prior(prior: &PriorState, mode: CompareMode) -> Self {
        match (prior.has_archive(), mode) {
            (false, _) => Self::Create,
            (true, CompareMode::ByteContent) => Self::Rebuild,
            (true, CompareMode::NamesOnly | CompareMode::SkipIfArchiveExists) => Self::Append,
        }
    }
}

/// An open chapter archive.
///
/// The underlying zip writer is held for the whole chapter and closed exactly
/// once, either by [`finish`](Self::finish) or on drop. Staged archives
/// (`Create`, `Rebuild`) are written to `<target>.part`, which only replaces
/// the target after a successful close; dropping an unfinished staged
/// archive deletes the `.part` file.
pub struct ChapterArchive {
    target: PathBuf,
    staging: Option<PathBuf>,
    writer: Option<ZipWriter<File>>,
    entries: BTreeSet<String>,
    strategy: WriteStrategy,
}

impl std::fmt::Debug for ChapterArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterArchive")
            .field("target", &self.target)
            .field("strategy", &self.strategy)
            .field("entries", &self.entries.len())
            .field("open", &self.writer.is_some())
            .finish_non_exhaustive()
    }
}

impl ChapterArchive {
    /// Opens the archive at `target` with the strategy implied by `prior`
    /// and `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the file cannot be created or the existing
    /// archive cannot be opened for appending.
    #[instrument(skip(prior), fields(target = %target.display()))]
    pub fn open_for(
        prior: &PriorState,
        target: &Path,
        mode: CompareMode,
    ) -> Result<Self, ArchiveError> {
        match WriteStrategy::for_prior(prior, mode) {
            WriteStrategy::Append => {
                let existing = match prior.archive() {
                    Some(ArchiveContents::Listed(names)) => names.clone(),
                    Some(ArchiveContents::Extracted(_)) | None => BTreeSet::new(),
                };
                Self::append(target, existing)
            }
            strategy => Self::staged(target, strategy),
        }
    }

    /// Creates a new archive staged at `<target>.part`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the staging file cannot be created.
    pub fn create(target: &Path) -> Result<Self, ArchiveError> {
        Self::staged(target, WriteStrategy::Create)
    }

    /// Opens an existing archive for appending. `existing` lists the entries
    /// it already holds.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the archive cannot be opened.
    pub fn append(target: &Path, existing: BTreeSet<String>) -> Result<Self, ArchiveError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(target)
            .map_err(|e| ArchiveError::io(target, e))?;
        let writer = ZipWriter::new_append(file).map_err(|e| ArchiveError::zip(target, e))?;
        debug!(path = %target.display(), existing = existing.len(), "appending to archive");
        Ok(Self {
            target: target.to_path_buf(),
            staging: None,
            writer: Some(writer),
            entries: existing,
            strategy: WriteStrategy::Append,
        })
    }

    fn staged(target: &Path, strategy: WriteStrategy) -> Result<Self, ArchiveError> {
        let staging = staging_path(target);
        let file = File::create(&staging).map_err(|e| ArchiveError::io(&staging, e))?;
        debug!(path = %staging.display(), ?strategy, "staging archive");
        Ok(Self {
            target: target.to_path_buf(),
            staging: Some(staging),
            writer: Some(ZipWriter::new(file)),
            entries: BTreeSet::new(),
            strategy,
        })
    }

    /// Final archive path.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Strategy this archive was opened with.
    #[must_use]
    pub fn strategy(&self) -> WriteStrategy {
        self.strategy
    }

    /// Returns true if an entry called `name` is already in the archive.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    /// Number of entries the archive will hold once finished.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the archive holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry from memory. Returns false if the entry already existed.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Zip`] or [`ArchiveError::Io`] if writing fails.
    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<bool, ArchiveError> {
        if self.contains(name) {
            return Ok(false);
        }
        let path = self.write_path().to_path_buf();
        let writer = self.open_writer()?;
        writer
            .start_file(name, entry_options())
            .map_err(|e| ArchiveError::zip(&path, e))?;
        writer
            .write_all(bytes)
            .map_err(|e| ArchiveError::io(&path, e))?;
        self.entries.insert(name.to_string());
        Ok(true)
    }

    /// Adds an entry by copying the file at `source`. Returns false if the
    /// entry already existed.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the source cannot be read or writing fails.
    pub fn add_file(&mut self, name: &str, source: &Path) -> Result<bool, ArchiveError> {
        if self.contains(name) {
            return Ok(false);
        }
        let mut reader =
            BufReader::new(File::open(source).map_err(|e| ArchiveError::io(source, e))?);
        let path = self.write_path().to_path_buf();
        let writer = self.open_writer()?;
        writer
            .start_file(name, entry_options())
            .map_err(|e| ArchiveError::zip(&path, e))?;
        io::copy(&mut reader, writer).map_err(|e| ArchiveError::io(&path, e))?;
        self.entries.insert(name.to_string());
        Ok(true)
    }

    /// Closes the archive, moves a staged archive over the target and checks
    /// that the result opens and lists every entry written.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if closing, renaming or verification fails.
    /// A staged file is removed on failure.
    #[instrument(skip(self), fields(target = %self.target.display(), entries = self.entries.len()))]
    pub fn finish(mut self) -> Result<PathBuf, ArchiveError> {
        let writer = self.open_writer_owned()?;
        let write_path = self.write_path().to_path_buf();
        let file = writer.finish().map_err(|e| ArchiveError::zip(&write_path, e))?;
        file.sync_all()
            .map_err(|e| ArchiveError::io(&write_path, e))?;
        drop(file);

        if let Some(staging) = self.staging.take() {
            if let Err(e) = fs::rename(&staging, &self.target) {
                remove_quietly(&staging);
                return Err(ArchiveError::io(&self.target, e));
            }
        }

        verify(&self.target, self.entries.len())?;
        info!(path = %self.target.display(), entries = self.entries.len(), "archive written");
        Ok(self.target.clone())
    }

    /// Closes the archive without publishing it. A staged file is deleted; an
    /// appended archive keeps the entries already written.
    pub fn discard(mut self) {
        self.close_on_abort();
    }

    fn write_path(&self) -> &Path {
        self.staging.as_deref().unwrap_or(&self.target)
    }

    fn open_writer(&mut self) -> Result<&mut ZipWriter<File>, ArchiveError> {
        let path = self.write_path().to_path_buf();
        self.writer.as_mut().ok_or_else(|| closed_error(&path))
    }

    fn open_writer_owned(&mut self) -> Result<ZipWriter<File>, ArchiveError> {
        let path = self.write_path().to_path_buf();
        self.writer.take().ok_or_else(|| closed_error(&path))
    }

    fn close_on_abort(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(error) = writer.finish() {
                warn!(path = %self.write_path().display(), %error, "failed to close archive");
            }
        }
        if let Some(staging) = self.staging.take() {
            remove_quietly(&staging);
        }
    }
}

impl Drop for ChapterArchive {
    fn drop(&mut self) {
        if self.writer.is_some() || self.staging.is_some() {
            debug!(path = %self.target.display(), "closing unfinished archive");
            self.close_on_abort();
        }
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

fn closed_error(path: &Path) -> ArchiveError {
    ArchiveError::io(
        path,
        io::Error::new(io::ErrorKind::BrokenPipe, "archive already closed"),
    )
}

fn remove_quietly(path: &Path) {
    if let Err(error) = fs::remove_file(path) {
        if error.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), %error, "failed to remove staging archive");
        }
    }
}

fn verify(path: &Path, expected: usize) -> Result<(), ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::zip(path, e))?;
    let actual = archive.len();
    if actual != expected {
        return Err(ArchiveError::Verification {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}
