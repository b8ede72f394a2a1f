// src/error.rs

//! Unified error handling for the harvester.

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// Transport failures are classified into a closed set of variants so that
/// callers can react to the exact condition (retry exhaustion, pagination end,
/// missing record) instead of inspecting strings.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client failed below the status-code level
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// The remote host could not be resolved
    #[error("Could not resolve host for {url}")]
    CouldNotResolveHost { url: String },

    /// The connection was refused by the server
    #[error("Connection refused by {url}")]
    ConnectionRefused { url: String },

    /// The connection was reset during the request
    #[error("Connection reset while fetching {url}")]
    ConnectionReset { url: String },

    /// The request hit the configured timeout
    #[error("Request timed out fetching {url}")]
    ConnectionTimeout { url: String },

    /// The redirect chain exceeded the configured maximum
    #[error("Too many redirects while fetching {url}")]
    TooManyRedirects { url: String },

    /// An HTTP error status (>= 400) was returned
    #[error("{}", status_line(*status, url))]
    Status { status: u16, url: String },

    /// HTTP 400 caused by requesting a page past the end of a collection.
    ///
    /// Not a failure: the paginated crawler consumes this as its end-of-data
    /// signal and `fetch_by_id` treats it like a missing record.
    #[error("Requested page is past the end of the collection")]
    InvalidPage,

    /// The site does not expose a usable `wp/v2` REST API
    #[error("No usable WordPress API found at {url}")]
    NoUsableApi { url: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Conventional reason phrases for the statuses the harvester names explicitly.
fn status_name(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("Bad Request"),
        401 => Some("Unauthorized"),
        403 => Some("Forbidden"),
        404 => Some("Not Found"),
        500 => Some("Internal Server Error"),
        502 => Some("Bad Gateway"),
        _ => None,
    }
}

pub(crate) fn status_line(status: u16, url: &str) -> String {
    match status_name(status) {
        Some(name) => format!("Error {status} ({name}) while fetching {url}"),
        None => format!("Error {status} while fetching {url}"),
    }
}

impl AppError {
    /// Create a classified error for an HTTP status.
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for the pagination end-of-data signal.
    pub fn is_invalid_page(&self) -> bool {
        matches!(self, Self::InvalidPage)
    }

    /// True for a plain HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
