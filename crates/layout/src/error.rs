//! Error types for the layout core

/// Result type alias using layout Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in layout computations
///
/// Layout faults are absorbed at the pipeline boundary: callers retain the
/// previous known-good state and log. These variants exist for construction
/// and validation paths that run once, not per pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}
