//! Manga Downloader Core Library
//!
//! Turns chapter records from the service's metadata API into one archive
//! per chapter, with deterministic names, per-page retries and safe
//! re-runs against whatever an earlier run left on disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`naming`] - Folder, archive and page names, volume prefix letters
//! - [`archive`] - Prior on-disk state, reconciliation and archive writing
//! - [`download`] - HTTP client, retry policy and concurrent page fetches
//! - [`chapter`] - Per-chapter orchestration from metadata to archive
//! - [`api`] - Chapter and title records from the metadata API
//! - [`selection`] - Language filter and chapter range expressions
//! - [`ledger`] - Persisted record of processed chapters per title
//! - [`runner`] - Sequential runs over titles and chapters

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod archive;
pub mod chapter;
pub mod config;
pub mod download;
pub mod languages;
pub mod ledger;
pub mod metadata;
pub mod naming;
pub mod runner;
pub mod selection;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, ChapterRecord, ChapterSummary, DEFAULT_API_URL, TitleRecord};
pub use archive::{Action, ArchiveError, PriorState, inspect, reconcile};
pub use chapter::{ChapterAssembler, ChapterError, ChapterJob, ChapterResult, ChapterStatus};
pub use config::{ArchiveFormat, CompareMode, ConfigError, DownloadOptions};
pub use download::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF, DownloadError, FailureType, FetchCoordinator,
    FetchOutcome, HttpClient, PageFetcher, PageRef, PageStatus, RetryDecision, RetryPolicy,
    classify_error,
};
pub use ledger::{LedgerError, TitleLedger};
pub use metadata::ChapterMetadata;
pub use naming::{ResolvedNames, VolumePrefixTable, assign_prefixes, resolve};
pub use runner::{RunError, RunSummary, Runner, UnitKind, collect_ids};
pub use selection::ChapterRange;
