//! Concurrent page fetches for one chapter.
//!
//! Every page of the chapter is requested at once on the current task; the
//! coordinator drains completions as they arrive and hands each payload to
//! the chapter's [`ChapterWorkspace`] on the blocking pool. Completions are
//! stored one at a time, so the folder and archive only ever see a single
//! writer.

use std::future::Future;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::client::PageFetcher;
use super::error::DownloadError;
use super::retry::{PageAttempt, RetryDecision, RetryPolicy, classify_error};
use crate::archive::{Action, ArchiveError, ChapterWorkspace};

/// One page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    /// Remote image name, appended to the chapter's base URL.
    pub remote_name: String,
    /// Resolved local file / archive entry name.
    pub file_name: String,
}

/// Final status of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Bytes received and reconciled (written, copied or already present).
    Success,
    /// Attempts exhausted, permanent error, or the page could not be stored.
    Failed,
}

/// Result of fetching one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    /// Remote image name.
    pub page_ref: String,
    /// Local file name.
    pub file_name: String,
    /// Final status.
    pub status: PageStatus,
    /// Attempts made.
    pub attempts: u32,
    /// Size of the received payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Reconciliation decision, for successful pages.
    #[serde(skip)]
    pub action: Option<Action>,
    /// Last error, for failed pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchOutcome {
    /// Returns true for successful pages.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PageStatus::Success
    }
}

/// Issues all page fetches of a chapter concurrently with per-page retries.
pub struct FetchCoordinator<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    policy: RetryPolicy,
    progress: Option<ProgressBar>,
}

impl<'a, F: PageFetcher + ?Sized> FetchCoordinator<'a, F> {
    /// Creates a coordinator using `fetcher` for transfers.
    #[must_use]
    pub fn new(fetcher: &'a F, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            policy,
            progress: None,
        }
    }

    /// Attaches an advisory progress bar, advanced once per finished page.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fetches every page under `base_url` and reconciles each payload into
    /// `workspace`.
    ///
    /// Returns the workspace with one outcome per page, in page order. A page
    /// that fails never stops its siblings; the call returns once every page
    /// is either `Success` or `Failed`.
    #[instrument(skip(self, pages, workspace), fields(pages = pages.len()))]
    pub async fn fetch_chapter(
        &self,
        base_url: &str,
        pages: &[PageRef],
        mut workspace: ChapterWorkspace,
    ) -> (ChapterWorkspace, Vec<FetchOutcome>) {
        if let Some(progress) = &self.progress {
            progress.set_length(pages.len() as u64);
            progress.set_position(0);
        }

        let mut in_flight: FuturesUnordered<_> = pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                let url = format!("{base_url}{}", page.remote_name);
                self.fetch_page(index, url)
            })
            .collect();

        let mut outcomes: Vec<Option<FetchOutcome>> = vec![None; pages.len()];
        while let Some(fetched) = in_flight.next().await {
            let page = &pages[fetched.index];
            let outcome = match fetched.result {
                Ok(bytes) => {
                    let size = bytes.len();
                    let (returned, stored) = store_page(workspace, &page.file_name, bytes).await;
                    workspace = returned;
                    match stored {
                        Ok(action) => FetchOutcome {
                            page_ref: page.remote_name.clone(),
                            file_name: page.file_name.clone(),
                            status: PageStatus::Success,
                            attempts: fetched.attempt.attempts(),
                            bytes: Some(size),
                            action: Some(action),
                            error: None,
                        },
                        Err(error) => {
                            warn!(page = %page.file_name, %error, "failed to store page");
                            failed_outcome(page, &fetched.attempt, error.to_string())
                        }
                    }
                }
                Err(error) => failed_outcome(page, &fetched.attempt, error.to_string()),
            };
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
            outcomes[fetched.index] = Some(outcome);
        }

        let outcomes: Vec<FetchOutcome> = outcomes.into_iter().flatten().collect();
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            succeeded = outcomes.len() - failed,
            failed, "chapter pages settled"
        );
        (workspace, outcomes)
    }

    /// Runs one page's attempt loop to a terminal state.
    fn fetch_page(&self, index: usize, url: String) -> impl Future<Output = PageFetch> + '_ {
        async move {
            let mut attempt = PageAttempt::new();
            loop {
                attempt.begin();
                debug!(%url, attempt = attempt.attempts(), "fetching page");
                match self.fetcher.fetch(&url).await {
                    Ok(bytes) => {
                        attempt.succeed();
                        return PageFetch {
                            index,
                            attempt,
                            result: Ok(bytes),
                        };
                    }
                    Err(error) => match attempt.fail(&self.policy, classify_error(&error)) {
                        RetryDecision::Retry { delay, attempt: next } => {
                            warn!(%url, %error, next_attempt = next, "page fetch failed, retrying");
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            warn!(%url, %error, %reason, "page fetch failed");
                            return PageFetch {
                                index,
                                attempt,
                                result: Err(error),
                            };
                        }
                    },
                }
            }
        }
    }
}

/// Applies one payload to the workspace on the blocking pool and hands the
/// workspace back.
async fn store_page(
    mut workspace: ChapterWorkspace,
    file_name: &str,
    bytes: Vec<u8>,
) -> (ChapterWorkspace, Result<Action, ArchiveError>) {
    let file_name = file_name.to_string();
    let task = tokio::task::spawn_blocking(move || {
        let stored = workspace.apply(&file_name, &bytes);
        (workspace, stored)
    });
    match task.await {
        Ok(stored) => stored,
        Err(error) => std::panic::resume_unwind(error.into_panic()),
    }
}

struct PageFetch {
    index: usize,
    attempt: PageAttempt,
    result: Result<Vec<u8>, DownloadError>,
}

fn failed_outcome(page: &PageRef, attempt: &PageAttempt, error: String) -> FetchOutcome {
    FetchOutcome {
        page_ref: page.remote_name.clone(),
        file_name: page.file_name.clone(),
        status: PageStatus::Failed,
        attempts: attempt.attempts(),
        bytes: None,
        action: None,
        error: Some(error),
    }
}
