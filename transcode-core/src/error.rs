//! Error types for the Transcode library.
//!
//! Filters report their own typed errors through [`Error::Filter`]; callers that
//! need to tell kinds apart can recover the concrete type with
//! [`Error::filter_error`].

use thiserror::Error;

/// Main error type for the Transcode library.
#[derive(Error, Debug)]
pub enum Error {
    /// Error raised by a bitstream filter while processing a packet.
    #[error("Filter error: {0}")]
    Filter(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unsupported feature or format.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Resource exhausted (memory, buffers, etc.).
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation cannot complete until the caller drains pending output.
    #[error("Resource temporarily unavailable, try again")]
    Again,

    /// End of stream reached.
    #[error("End of stream")]
    EndOfStream,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Wrap a filter-specific error.
    pub fn filter<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Filter(Box::new(err))
    }

    /// Get the filter-specific error if this is one of type `E`.
    pub fn filter_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Error::Filter(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }

    /// Check if the caller should drain output and retry.
    #[must_use]
    pub fn is_again(&self) -> bool {
        matches!(self, Error::Again)
    }
}
