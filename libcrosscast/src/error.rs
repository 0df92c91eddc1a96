//! Error types for Crosscast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrosscastError>;

#[derive(Error, Debug)]
pub enum CrosscastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CrosscastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrosscastError::InvalidInput(_) => 3,
            CrosscastError::Publish(PublishError::CredentialsNotFound(_)) => 2,
            CrosscastError::Publish(_) => 1,
            CrosscastError::Config(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Everything that can go wrong inside the publishing pipeline.
///
/// These are the only error kinds a coordinator may surface; the
/// dispatcher folds them into a [`crate::types::PublishResult`] so no
/// platform-specific failure ever crosses the pipeline boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("No media or text content supplied")]
    NoMedia,

    #[error("Publish quota exhausted ({usage}/{total})")]
    QuotaExceeded { usage: u32, total: u32 },

    #[error("Credentials not found: {0}")]
    CredentialsNotFound(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transient platform error: {0}")]
    Transient(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl PublishError {
    /// Machine-readable kind, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::UnsupportedMedia(_) => "unsupported_media",
            PublishError::UnsupportedPlatform(_) => "unsupported_platform",
            PublishError::NoMedia => "no_media",
            PublishError::QuotaExceeded { .. } => "quota_exceeded",
            PublishError::CredentialsNotFound(_) => "credentials_not_found",
            PublishError::Protocol(_) => "protocol",
            PublishError::Transient(_) => "transient",
            PublishError::Timeout(_) => "timeout",
            PublishError::Storage(_) => "storage",
        }
    }

    /// Whether the platform flagged this error as safe to retry.
    ///
    /// Only carousel container creation acts on this; everywhere else
    /// the first error aborts the component.
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient(_))
    }
}
