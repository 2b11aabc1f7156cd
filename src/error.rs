//! Error types for status retrieval
//!
//! Every failure while fetching or parsing a single status page ends up as a
//! [`RetrieveError`]. The retriever turns it into a yellow server and uses its
//! `Display` output as the alert message.

use std::fmt;
use std::num::ParseIntError;

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors raised by a page fetcher
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be sent or completed
    Request(String),

    /// The request did not finish within the configured timeout
    Timeout(String),

    /// The server answered with an unexpected HTTP status
    Status(u16),

    /// The response body could not be read
    Body(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Request(msg) => write!(f, "request failed: {}", msg),
            FetchError::Timeout(msg) => write!(f, "request timed out: {}", msg),
            FetchError::Status(code) => write!(f, "unexpected HTTP status {}", code),
            FetchError::Body(msg) => write!(f, "failed to read status page: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_body() || err.is_decode() {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

/// Errors raised while recovering metrics from a status page
#[derive(Debug)]
pub enum ExtractError {
    /// The configured marker class does not form a valid selector
    InvalidMarker(String),

    /// A recognized label has no value cell next to it
    MissingValue { label: String },

    /// A numeric value cell did not hold a whole number
    InvalidNumber {
        label: String,
        value: String,
        source: ParseIntError,
    },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::InvalidMarker(msg) => write!(f, "invalid marker class: {}", msg),
            ExtractError::MissingValue { label } => {
                write!(f, "no value cell found for label '{}'", label)
            }
            ExtractError::InvalidNumber {
                label,
                value,
                source,
            } => write!(f, "invalid number '{}' for label '{}': {}", value, label, source),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::InvalidNumber { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Any failure that turns a server yellow
#[derive(Debug)]
pub enum RetrieveError {
    Fetch(FetchError),
    Extract(ExtractError),
}

impl RetrieveError {
    /// Short failure kind used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            RetrieveError::Fetch(FetchError::Request(_)) => "request",
            RetrieveError::Fetch(FetchError::Timeout(_)) => "timeout",
            RetrieveError::Fetch(FetchError::Status(_)) => "status",
            RetrieveError::Fetch(FetchError::Body(_)) => "body",
            RetrieveError::Extract(ExtractError::InvalidMarker(_)) => "marker",
            RetrieveError::Extract(ExtractError::MissingValue { .. }) => "missing-value",
            RetrieveError::Extract(ExtractError::InvalidNumber { .. }) => "invalid-number",
        }
    }
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieveError::Fetch(err) => write!(f, "{}", err),
            RetrieveError::Extract(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RetrieveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetrieveError::Fetch(err) => Some(err),
            RetrieveError::Extract(err) => Some(err),
        }
    }
}

impl From<FetchError> for RetrieveError {
    fn from(err: FetchError) -> Self {
        RetrieveError::Fetch(err)
    }
}

impl From<ExtractError> for RetrieveError {
    fn from(err: ExtractError) -> Self {
        RetrieveError::Extract(err)
    }
}
