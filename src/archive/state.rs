//! Prior on-disk state of a chapter target and per-page reconciliation.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use zip::ZipArchive;

use super::ArchiveError;
use crate::config::CompareMode;

/// File names found in one directory (a loose chapter folder or a scratch
/// extraction of an archive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIndex {
    dir: PathBuf,
    names: BTreeSet<String>,
}

impl PageIndex {
    /// Lists the regular files directly inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the directory cannot be read.
    pub fn scan(dir: &Path) -> Result<Self, ArchiveError> {
        let mut names = BTreeSet::new();
        let entries = fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ArchiveError::io(dir, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| ArchiveError::io(entry.path(), e))?
                .is_file();
            if is_file && let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    /// Directory this index describes.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a page of this index lives at.
    #[must_use]
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Returns true if a file called `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns true if `name` exists and its content equals `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the existing file cannot be read.
    pub fn matches_bytes(&self, name: &str, bytes: &[u8]) -> Result<bool, ArchiveError> {
        if !self.contains(name) {
            return Ok(false);
        }
        let path = self.path_of(name);
        let existing = fs::read(&path).map_err(|e| ArchiveError::io(&path, e))?;
        Ok(existing == bytes)
    }

    /// File names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the directory held no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// What is known about an existing archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveContents {
    /// Entry names read from the central directory.
    Listed(BTreeSet<String>),
    /// Entries extracted to a scratch directory for byte comparison.
    Extracted(PageIndex),
}

impl ArchiveContents {
    /// Returns true if an entry called `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::Listed(names) => names.contains(name),
            Self::Extracted(index) => index.contains(name),
        }
    }
}

/// On-disk state of a chapter target before fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorState {
    /// Neither folder nor archive exists.
    Absent,
    /// Only the loose page folder exists.
    FolderOnly(PageIndex),
    /// Only the archive exists.
    ArchiveOnly(ArchiveContents),
    /// Both exist.
    Both {
        /// Loose page folder.
        folder: PageIndex,
        /// Archive contents.
        archive: ArchiveContents,
    },
}

impl PriorState {
    /// Returns true if an archive was found.
    #[must_use]
    pub fn has_archive(&self) -> bool {
        self.archive().is_some()
    }

    /// Returns true if a loose folder was found.
    #[must_use]
    pub fn has_folder(&self) -> bool {
        self.folder().is_some()
    }

    /// Loose folder index, if any.
    #[must_use]
    pub fn folder(&self) -> Option<&PageIndex> {
        match self {
            Self::FolderOnly(folder) | Self::Both { folder, .. } => Some(folder),
            Self::Absent | Self::ArchiveOnly(_) => None,
        }
    }

    /// Archive contents, if any.
    #[must_use]
    pub fn archive(&self) -> Option<&ArchiveContents> {
        match self {
            Self::ArchiveOnly(archive) | Self::Both { archive, .. } => Some(archive),
            Self::Absent | Self::FolderOnly(_) => None,
        }
    }

    /// Extracts the existing archive at `archive_path` into `scratch` so its
    /// entries can be compared byte for byte.
    ///
    /// States without an archive are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Corrupt`] (after removing the archive) when
    /// extraction fails, or [`ArchiveError::Io`] if the scratch directory
    /// cannot be listed.
    #[instrument(skip(self), fields(archive = %archive_path.display(), scratch = %scratch.display()))]
    pub fn extract_archive(self, archive_path: &Path, scratch: &Path) -> Result<Self, ArchiveError> {
        let folder = match self {
            Self::Absent | Self::FolderOnly(_) => return Ok(self),
            Self::ArchiveOnly(ArchiveContents::Extracted(_))
            | Self::Both {
                archive: ArchiveContents::Extracted(_),
                ..
            } => return Ok(self),
            Self::ArchiveOnly(ArchiveContents::Listed(_)) => None,
            Self::Both { folder, .. } => Some(folder),
        };

        let mut archive = open_archive(archive_path)?;
        if let Err(source) = archive.extract(scratch) {
            return Err(remove_corrupt(archive_path, source));
        }
        let extracted = ArchiveContents::Extracted(PageIndex::scan(scratch)?);
        debug!("existing archive extracted for byte comparison");

        Ok(match folder {
            Some(folder) => Self::Both {
                folder,
                archive: extracted,
            },
            None => Self::ArchiveOnly(extracted),
        })
    }
}

/// Inspects the loose folder and archive of a chapter target.
///
/// # Errors
///
/// Returns [`ArchiveError::Corrupt`] when the archive exists but cannot be
/// opened; the corrupt file is deleted first. Returns [`ArchiveError::Io`]
/// if the folder cannot be listed.
#[instrument(fields(folder = %folder.display(), archive = %archive.display()))]
pub fn inspect(folder: &Path, archive: &Path) -> Result<PriorState, ArchiveError> {
    let folder_index = if folder.is_dir() {
        Some(PageIndex::scan(folder)?)
    } else {
        None
    };

    let archive_contents = if archive.is_file() {
        let zip = open_archive(archive)?;
        let names = zip.file_names().map(str::to_string).collect();
        Some(ArchiveContents::Listed(names))
    } else {
        None
    };

    let state = match (folder_index, archive_contents) {
        (None, None) => PriorState::Absent,
        (Some(folder), None) => PriorState::FolderOnly(folder),
        (None, Some(archive)) => PriorState::ArchiveOnly(archive),
        (Some(folder), Some(archive)) => PriorState::Both { folder, archive },
    };
    debug!(
        has_folder = state.has_folder(),
        has_archive = state.has_archive(),
        "inspected chapter target"
    );
    Ok(state)
}

/// Decision for one fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Already present in the archive being written; nothing to do.
    Skip,
    /// New or changed page: write to the folder and add to the archive.
    WriteFolderAndArchive,
    /// Identical page found in the extracted archive: copy it back into the
    /// folder and add it to the rebuilt archive.
    CopyFromArchiveToFolder,
    /// Page already in the loose folder: add that file to the archive.
    ArchiveFromFolder,
}

impl Action {
    /// Returns true if fresh bytes were written.
    #[must_use]
    pub fn is_new_write(self) -> bool {
        matches!(self, Self::WriteFolderAndArchive)
    }
}

/// Decides what to do with a fetched page given the prior state.
///
/// In names mode a page counts as present when an entry of the same name
/// exists; the archive is checked before the folder. In data mode the stored
/// bytes must equal `bytes`; the folder is checked before the extracted
/// archive. `SkipIfArchiveExists` only reaches this point when no archive
/// exists and then behaves like names mode.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if an existing page cannot be read for
/// comparison.
pub fn reconcile(
    prior: &PriorState,
    page_name: &str,
    bytes: &[u8],
    mode: CompareMode,
) -> Result<Action, ArchiveError> {
    let action = match mode {
        CompareMode::NamesOnly | CompareMode::SkipIfArchiveExists => {
            if prior.archive().is_some_and(|a| a.contains(page_name)) {
                Action::Skip
            } else if prior.folder().is_some_and(|f| f.contains(page_name)) {
                Action::ArchiveFromFolder
            } else {
                Action::WriteFolderAndArchive
            }
        }
        CompareMode::ByteContent => {
            if let Some(folder) = prior.folder()
                && folder.matches_bytes(page_name, bytes)?
            {
                Action::ArchiveFromFolder
            } else if let Some(ArchiveContents::Extracted(scratch)) = prior.archive()
                && scratch.matches_bytes(page_name, bytes)?
            {
                Action::CopyFromArchiveToFolder
            } else {
                Action::WriteFolderAndArchive
            }
        }
    };
    debug!(page = page_name, ?action, %mode, "reconciled page");
    Ok(action)
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, ArchiveError> {
    let file = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| remove_corrupt(path, source))
}

fn remove_corrupt(path: &Path, source: zip::result::ZipError) -> ArchiveError {
    warn!(path = %path.display(), error = %source, "bad archive detected, deleting");
    if let Err(error) = fs::remove_file(path) {
        warn!(path = %path.display(), %error, "failed to delete corrupt archive");
    }
    ArchiveError::corrupt(path, source)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_inspect_absent() {
        let temp = TempDir::new().unwrap();
        let state = inspect(&temp.path().join("ch"), &temp.path().join("ch.cbz")).unwrap();
        assert_eq!(state, PriorState::Absent);
    }

    #[test]
    fn test_inspect_folder_only_lists_files() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("ch");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("p001.png"), b"one").unwrap();
        fs::create_dir(folder.join("nested")).unwrap();

        let state = inspect(&folder, &temp.path().join("ch.cbz")).unwrap();
        let index = state.folder().unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains("p001.png"));
        assert!(!state.has_archive());
    }

    #[test]
    fn test_inspect_both() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("ch");
        let archive = temp.path().join("ch.cbz");
        fs::create_dir(&folder).unwrap();
        write_zip(&archive, &[("p001.png", "one")]);

        let state = inspect(&folder, &archive).unwrap();
        assert!(matches!(state, PriorState::Both { .. }));
        assert!(state.archive().unwrap().contains("p001.png"));
    }

    #[test]
    fn test_inspect_corrupt_archive_is_removed() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("ch.cbz");
        fs::write(&archive, b"definitely not a zip").unwrap();

        let err = inspect(&temp.path().join("ch"), &archive).unwrap_err();
        assert!(err.is_corrupt(), "got {err:?}");
        assert!(!archive.exists(), "corrupt archive should be deleted");
    }

    #[test]
    fn test_extract_archive_switches_to_extracted() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("ch.cbz");
        let scratch = temp.path().join("scratch");
        fs::create_dir(&scratch).unwrap();
        write_zip(&archive, &[("p001.png", "one"), ("p002.png", "two")]);

        let state = inspect(&temp.path().join("ch"), &archive)
            .unwrap()
            .extract_archive(&archive, &scratch)
            .unwrap();

        match state.archive() {
            Some(ArchiveContents::Extracted(index)) => {
                assert_eq!(index.len(), 2);
                assert!(index.matches_bytes("p002.png", b"two").unwrap());
            }
            other => panic!("expected extracted contents, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_archive_without_archive_is_noop() {
        let temp = TempDir::new().unwrap();
        let state = PriorState::Absent
            .extract_archive(&temp.path().join("none.cbz"), temp.path())
            .unwrap();
        assert_eq!(state, PriorState::Absent);
    }

    #[test]
    fn test_reconcile_names_mode() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("ch");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("loose.png"), b"stale").unwrap();
        let state = PriorState::Both {
            folder: PageIndex::scan(&folder).unwrap(),
            archive: ArchiveContents::Listed(BTreeSet::from(["zipped.png".to_string()])),
        };

        let mode = CompareMode::NamesOnly;
        assert_eq!(reconcile(&state, "zipped.png", b"x", mode).unwrap(), Action::Skip);
        assert_eq!(
            reconcile(&state, "loose.png", b"fresh", mode).unwrap(),
            Action::ArchiveFromFolder
        );
        assert_eq!(
            reconcile(&state, "new.png", b"x", mode).unwrap(),
            Action::WriteFolderAndArchive
        );
    }

    #[test]
    fn test_reconcile_data_mode_compares_bytes() {
        let temp = TempDir::new().unwrap();
        let folder = temp.path().join("ch");
        let scratch = temp.path().join("scratch");
        fs::create_dir(&folder).unwrap();
        fs::create_dir(&scratch).unwrap();
        fs::write(folder.join("a.png"), b"same").unwrap();
        fs::write(folder.join("b.png"), b"old").unwrap();
        fs::write(scratch.join("c.png"), b"zipped").unwrap();
        let state = PriorState::Both {
            folder: PageIndex::scan(&folder).unwrap(),
            archive: ArchiveContents::Extracted(PageIndex::scan(&scratch).unwrap()),
        };

        let mode = CompareMode::ByteContent;
        assert_eq!(
            reconcile(&state, "a.png", b"same", mode).unwrap(),
            Action::ArchiveFromFolder
        );
        assert_eq!(
            reconcile(&state, "b.png", b"new", mode).unwrap(),
            Action::WriteFolderAndArchive
        );
        assert_eq!(
            reconcile(&state, "c.png", b"zipped", mode).unwrap(),
            Action::CopyFromArchiveToFolder
        );
        assert_eq!(
            reconcile(&state, "c.png", b"changed", mode).unwrap(),
            Action::WriteFolderAndArchive
        );
    }

    #[test]
    fn test_reconcile_absent_always_writes() {
        for mode in [
            CompareMode::NamesOnly,
            CompareMode::ByteContent,
            CompareMode::SkipIfArchiveExists,
        ] {
            assert_eq!(
                reconcile(&PriorState::Absent, "p.png", b"x", mode).unwrap(),
                Action::WriteFolderAndArchive
            );
        }
    }
}
