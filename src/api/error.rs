//! Errors raised by the upstream metadata client.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors fetching chapter or title records. None of them are retried: the
/// resource will not become available by asking again.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The resource was deleted or is not readable (HTTP 300, 404, 410).
    #[error("{kind} {id} is unavailable (HTTP {status})")]
    Unavailable {
        /// `chapter` or `title`.
        kind: &'static str,
        /// Requested identifier.
        id: u64,
        /// HTTP status received.
        status: u16,
    },

    /// The resource is region- or rights-restricted (HTTP 451, 403).
    #[error("{kind} {id} is restricted (HTTP {status})")]
    Restricted {
        /// `chapter` or `title`.
        kind: &'static str,
        /// Requested identifier.
        id: u64,
        /// HTTP status received.
        status: u16,
    },

    /// The chapter is hosted outside the service and cannot be fetched.
    #[error("chapter {id} is hosted externally")]
    External {
        /// Chapter identifier.
        id: u64,
    },

    /// Any other non-200 status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status received.
        status: u16,
    },

    /// The request could not be completed.
    #[error("request to {url} failed: {source}")]
    Network {
        /// Requested URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: DownloadError,
    },

    /// The request timed out.
    #[error("timeout requesting {url}")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The response body was not the expected JSON.
    #[error("invalid response from {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The configured API base URL cannot be joined with a path.
    #[error("invalid API URL: {url}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
    },
}

impl ApiError {
    /// Maps a non-200 status for resource `kind`/`id` to the matching variant.
    pub fn from_status(kind: &'static str, id: u64, url: impl Into<String>, status: u16) -> Self {
        match status {
            300 | 404 | 410 => Self::Unavailable { kind, id, status },
            403 | 451 => Self::Restricted { kind, id, status },
            _ => Self::Status {
                url: url.into(),
                status,
            },
        }
    }

    /// Wraps a transport error, keeping timeouts distinct.
    pub fn transport(url: impl Into<String>, source: DownloadError) -> Self {
        let url = url.into();
        match source {
            DownloadError::Timeout { .. } => Self::Timeout { url },
            DownloadError::InvalidUrl { .. } => Self::InvalidUrl { url },
            source => Self::Network { url, source },
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }
}
