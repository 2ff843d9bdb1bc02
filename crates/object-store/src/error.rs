//! Error types for the staging store.

/// Errors that can occur when setting up or using the staging store.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid staging key
    #[error("invalid staging key '{0}'")]
    InvalidKey(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting the service.")]
    BucketNotFound(String),
}

/// Result type alias for staging store operations.
pub type Result<T> = std::result::Result<T, StagingError>;
