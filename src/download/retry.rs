//! Retry classification and the per-page attempt state machine.
//!
//! When a page fetch fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - timeouts, connection failures and any
//!   unexpected HTTP status; retried
//! - [`FailureType::Permanent`] - malformed URLs; never retried
//!
//! Each page owns a [`PageAttempt`] that moves through
//! `Pending → InFlight → (RetryWait → InFlight)* → Success | Failed`.
//! The [`RetryPolicy`] caps the number of attempts and supplies the fixed
//! wait between them.
//!
//! # Example
//!
//! ```
//! use mdownloader_core::download::{
//!     DownloadError, PageAttempt, PageState, RetryDecision, RetryPolicy, classify_error,
//! };
//!
//! let policy = RetryPolicy::default();
//! let mut attempt = PageAttempt::new();
//! attempt.begin();
//! let error = DownloadError::http_status("https://example.org/x1.png", 503);
//!
//! match attempt.fail(&policy, classify_error(&error)) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! assert_eq!(attempt.state(), PageState::RetryWait);
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::DownloadError;
use super::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF};

/// Classification of page fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,

    /// Failure that won't succeed regardless of retries.
    Permanent,
}

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Attempt ceiling and fixed backoff for page fetches.
///
/// Defaults: 5 attempts, 3 seconds between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Wait before each retry.
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the wait between attempts.
    #[must_use]
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = self.backoff.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay: self.backoff,
            attempt: attempt + 1,
        }
    }
}

/// Classifies a page fetch error.
///
/// | Error | Type |
/// |-------|------|
/// | HttpStatus (any) | Transient |
/// | Timeout | Transient |
/// | Network | Transient |
/// | InvalidUrl | Permanent |
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { .. }
        | DownloadError::Timeout { .. }
        | DownloadError::Network { .. } => FailureType::Transient,
        DownloadError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

/// Lifecycle of a single page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Not yet requested.
    Pending,
    /// Request outstanding.
    InFlight,
    /// Last attempt failed; waiting out the backoff.
    RetryWait,
    /// Bytes received.
    Success,
    /// Attempts exhausted or permanent failure.
    Failed,
}

impl PageState {
    /// Returns true for `Success` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// Per-page attempt counter and state, owned by the task fetching that page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAttempt {
    attempts: u32,
    state: PageState,
}

impl Default for PageAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl PageAttempt {
    /// A page that has not been requested yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempts: 0,
            state: PageState::Pending,
        }
    }

    /// Attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PageState {
        self.state
    }

    /// `Pending | RetryWait → InFlight`.
    pub fn begin(&mut self) {
        debug_assert!(!self.state.is_terminal(), "attempt started after {:?}", self.state);
        self.attempts += 1;
        self.state = PageState::InFlight;
    }

    /// `InFlight → Success`.
    pub fn succeed(&mut self) {
        self.state = PageState::Success;
    }

    /// `InFlight → RetryWait | Failed`, as decided by `policy`.
    pub fn fail(&mut self, policy: &RetryPolicy, failure_type: FailureType) -> RetryDecision {
        let decision = policy.should_retry(failure_type, self.attempts);
        self.state = match decision {
            RetryDecision::Retry { .. } => PageState::RetryWait,
            RetryDecision::DoNotRetry { .. } => PageState::Failed,
        };
        decision
    }
}
