//! Error types for folder and archive operations.

use std::path::PathBuf;

use thiserror::Error;
use zip::result::ZipError;

/// Errors raised while inspecting, extracting or writing chapter archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An existing archive could not be opened or extracted. The file has
    /// been removed by the time this error is returned.
    #[error("corrupt archive {path} removed: {source}")]
    Corrupt {
        /// Path of the removed archive.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: ZipError,
    },

    /// Writing an archive entry or finishing the archive failed.
    #[error("zip error writing {path}: {source}")]
    Zip {
        /// Archive path.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: ZipError,
    },

    /// File system error on a folder, page file or archive.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The finished archive does not list the entries that were written.
    #[error("archive {path} failed verification: expected {expected} entries, found {actual}")]
    Verification {
        /// Archive path.
        path: PathBuf,
        /// Entries written.
        expected: usize,
        /// Entries found when reopening.
        actual: usize,
    },
}

impl ArchiveError {
    /// Creates a corrupt-archive error.
    pub fn corrupt(path: impl Into<PathBuf>, source: ZipError) -> Self {
        Self::Corrupt {
            path: path.into(),
            source,
        }
    }

    /// Creates a zip write error.
    pub fn zip(path: impl Into<PathBuf>, source: ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors caused by a corrupt pre-existing archive.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_error_corrupt_display() {
        let error = ArchiveError::corrupt(
            "/tmp/ch.cbz",
            ZipError::InvalidArchive("bad magic".into()),
        );
        let msg = error.to_string();
        assert!(msg.contains("corrupt archive"), "got: {msg}");
        assert!(msg.contains("/tmp/ch.cbz"), "got: {msg}");
        assert!(error.is_corrupt());
    }

    #[test]
    fn test_archive_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = ArchiveError::io("/tmp/folder", io_error);
        assert!(error.to_string().contains("/tmp/folder"));
        assert!(!error.is_corrupt());
    }

    #[test]
    fn test_archive_error_verification_display() {
        let error = ArchiveError::Verification {
            path: PathBuf::from("/tmp/a.zip"),
            expected: 3,
            actual: 2,
        };
        let msg = error.to_string();
        assert!(msg.contains("expected 3"));
        assert!(msg.contains("found 2"));
    }
}
