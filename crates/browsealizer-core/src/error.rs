use browsealizer_api::{GitHubError, ResetWait};
use thiserror::Error;

/// All the ways things can go wrong in Browsealizer
///
/// We use thiserror here because it generates the boilerplate for us.
/// Life's too short to manually implement Display and Error traits.
#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API rate limit exceeded. Try again in {wait}")]
    RateLimited { wait: ResetWait },

    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<GitHubError> for Error {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::RateLimited { wait } => Error::RateLimited { wait },
            GitHubError::Timeout(_) => Error::Timeout,
            GitHubError::NotFound(what) => Error::NotFound(what),
            other => Error::ApiError(other.to_string()),
        }
    }
}
