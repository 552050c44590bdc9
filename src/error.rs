/// Error taxonomy for Smart Bookmarks
use thiserror::Error;

/// Input rejected before any request is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty")]
    Empty,
    #[error("invalid-url")]
    InvalidUrl,
}

impl ValidationError {
    /// Stable machine-readable code ("empty" / "invalid-url")
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Empty => "empty",
            ValidationError::InvalidUrl => "invalid-url",
        }
    }
}

/// Failure reported by the remote store or the identity provider.
///
/// The message is kept verbatim so the UI can show exactly what the backend said.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> RequestError {
        RequestError {
            message: message.into(),
        }
    }
}

/// Content of the single error slot shown above the bookmark list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Title is required.")]
    MissingTitle,

    #[error("Please enter a valid URL.")]
    InvalidUrl(#[source] ValidationError),

    #[error("Please sign in first.")]
    NotSignedIn,

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Startup configuration problems
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing config field: {0}")]
    MissingField(&'static str),

    #[error("invalid URL in {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("unknown log level: {0}")]
    InvalidLogLevel(String),

    #[error("failed to read config: {0}")]
    Malformed(String),
}
