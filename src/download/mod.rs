//! Page transfer: HTTP client, retry policy and the per-chapter fetch
//! coordinator.
//!
//! # Features
//!
//! - All pages of a chapter fetched concurrently on one task
//! - Fixed-backoff retries with an explicit per-page state machine
//! - Configurable timeouts (30s connect, 5min read by default)
//! - Structured error types with the failing URL attached
//!
//! # Example
//!
//! ```no_run
//! use mdownloader_core::download::{FetchCoordinator, HttpClient, PageRef, RetryPolicy};
//! # use mdownloader_core::archive::ChapterWorkspace;
//!
//! # async fn example(workspace: ChapterWorkspace) {
//! let client = HttpClient::new();
//! let coordinator = FetchCoordinator::new(&client, RetryPolicy::default());
//! let pages = vec![PageRef {
//!     remote_name: "x1.png".to_string(),
//!     file_name: "Title - c001 - p001 [Group].png".to_string(),
//! }];
//! let (workspace, outcomes) = coordinator
//!     .fetch_chapter("https://s2.example.org/data/abc123/", &pages, workspace)
//!     .await;
//! println!("{} pages settled", outcomes.len());
//! let archive = workspace.finish();
//! # drop(archive);
//! # }
//! ```

mod client;
mod constants;
mod coordinator;
mod error;
mod retry;

pub use client::{HttpClient, PageFetcher, default_user_agent};
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF, READ_TIMEOUT_SECS,
};
pub use coordinator::{FetchCoordinator, FetchOutcome, PageRef, PageStatus};
pub use error::DownloadError;
pub use retry::{FailureType, PageAttempt, PageState, RetryDecision, RetryPolicy, classify_error};
