//! Constants for the download module (timeouts, retries).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Attempts per page, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Fixed wait between attempts on the same page.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(3);
