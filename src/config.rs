//! Download options recognized by the chapter pipeline.
//!
//! Values parse from the strings the CLI accepts (`names`, `data`, `skip`,
//! `zip`, `cbz`). Parsing failures are [`ConfigError`]s so a bad value is
//! rejected before any network request is made.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::languages;

/// Default delay between chapters of the same run.
pub const DEFAULT_CHAPTER_DELAY: Duration = Duration::from_secs(5);

/// Default delay between titles in bulk mode.
pub const DEFAULT_TITLE_DELAY: Duration = Duration::from_secs(30);

/// Default download root.
pub const DEFAULT_OUTPUT_DIR: &str = "./downloads";

/// Errors raised while validating configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Unknown image comparison mode.
    #[error("invalid compare mode `{value}`: expected one of names, data, skip")]
    InvalidCompareMode {
        /// The rejected value.
        value: String,
    },

    /// Unknown archive format.
    #[error("invalid archive format `{value}`: expected zip or cbz")]
    InvalidArchiveFormat {
        /// The rejected value.
        value: String,
    },

    /// Language code not present in the language tables.
    #[error("unknown language code `{code}`")]
    UnknownLanguage {
        /// The rejected code.
        code: String,
    },

    /// Output directory is empty.
    #[error("output directory must not be empty")]
    EmptyOutputDir,
}

/// How an existing folder/archive is compared with freshly fetched pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// A page is present when an entry of the same name exists.
    #[default]
    NamesOnly,
    /// A page is present only when the stored bytes equal the fetched bytes.
    ByteContent,
    /// An existing archive means the chapter is done; nothing is inspected.
    SkipIfArchiveExists,
}

impl CompareMode {
    /// Stable string label, matching what [`FromStr`] accepts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NamesOnly => "names",
            Self::ByteContent => "data",
            Self::SkipIfArchiveExists => "skip",
        }
    }
}

impl FromStr for CompareMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "names" => Ok(Self::NamesOnly),
            "data" => Ok(Self::ByteContent),
            "skip" => Ok(Self::SkipIfArchiveExists),
            _ => Err(ConfigError::InvalidCompareMode {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archive container extension. Both are plain zip files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    Zip,
    #[default]
    Cbz,
}

impl ArchiveFormat {
    /// File extension without the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Cbz => "cbz",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "cbz" => Ok(Self::Cbz),
            _ => Err(ConfigError::InvalidArchiveFormat {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options shared by every chapter of a run.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Existing-content comparison policy.
    pub compare_mode: CompareMode,
    /// Archive extension.
    pub archive_format: ArchiveFormat,
    /// Keep the loose page folder next to the archive.
    pub keep_loose_folder: bool,
    /// Language code chapters are filtered by.
    pub language: String,
    /// Root directory series folders are created under.
    pub output_dir: PathBuf,
    /// Pause between chapters.
    pub chapter_delay: Duration,
    /// Pause between titles in bulk mode.
    pub title_delay: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            compare_mode: CompareMode::default(),
            archive_format: ArchiveFormat::default(),
            keep_loose_folder: false,
            language: languages::DEFAULT_LANGUAGE.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            chapter_delay: DEFAULT_CHAPTER_DELAY,
            title_delay: DEFAULT_TITLE_DELAY,
        }
    }
}

impl DownloadOptions {
    /// Checks values that cannot be enforced by the type system.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownLanguage`] for a language code missing
    /// from the tables and [`ConfigError::EmptyOutputDir`] for an empty root.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !languages::is_known(&self.language) {
            return Err(ConfigError::UnknownLanguage {
                code: self.language.clone(),
            });
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_mode_parses_cli_labels() {
        assert_eq!("names".parse::<CompareMode>(), Ok(CompareMode::NamesOnly));
        assert_eq!("data".parse::<CompareMode>(), Ok(CompareMode::ByteContent));
        assert_eq!("SKIP".parse::<CompareMode>(), Ok(CompareMode::SkipIfArchiveExists));
    }

    #[test]
    fn test_compare_mode_rejects_unknown_value() {
        let err = "bytes".parse::<CompareMode>().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidCompareMode {
                value: "bytes".to_string()
            }
        );
        assert!(err.to_string().contains("names, data, skip"));
    }

    #[test]
    fn test_archive_format_extension() {
        assert_eq!("zip".parse::<ArchiveFormat>().unwrap().extension(), "zip");
        assert_eq!("cbz".parse::<ArchiveFormat>().unwrap().extension(), "cbz");
        assert!("rar".parse::<ArchiveFormat>().is_err());
    }

    #[test]
    fn test_compare_mode_display_round_trips() {
        for mode in [
            CompareMode::NamesOnly,
            CompareMode::ByteContent,
            CompareMode::SkipIfArchiveExists,
        ] {
            assert_eq!(mode.to_string().parse::<CompareMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_default_options_validate() {
        let options = DownloadOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.archive_format, ArchiveFormat::Cbz);
        assert!(!options.keep_loose_folder);
    }

    #[test]
    fn test_validate_rejects_unknown_language() {
        let options = DownloadOptions {
            language: "xx".to_string(),
            ..DownloadOptions::default()
        };
        assert_eq!(
            options.validate(),
            Err(ConfigError::UnknownLanguage {
                code: "xx".to_string()
            })
        );
    }

    #[test]
    fn test_validate_rejects_empty_output_dir() {
        let options = DownloadOptions {
            output_dir: PathBuf::new(),
            ..DownloadOptions::default()
        };
        assert_eq!(options.validate(), Err(ConfigError::EmptyOutputDir));
    }
}
