//! Error types for the coordinator

/// Result type alias using coordinator Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in coordinator operations
///
/// None of these cross the coordinator's public event-handling boundary:
/// pass-internal faults are absorbed and logged, with the previous
/// known-good state retained. Construction and collaborator calls return
/// them normally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport pause/resume command failure
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Signaling emission failure
    #[error("Signaling error: {0}")]
    SignalingError(String),

    /// Session state error
    #[error("Session error: {0}")]
    SessionError(String),

    /// Layout core error
    #[error("Layout error: {0}")]
    LayoutError(#[from] mediagrid_layout::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable
    ///
    /// Transport and signaling round-trips are retried once with no
    /// backoff; everything else is not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransportError(_) | Error::SignalingError(_))
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::InvalidConfig(_) => true,
            Error::LayoutError(inner) => inner.is_config_error(),
            _ => false,
        }
    }
}
