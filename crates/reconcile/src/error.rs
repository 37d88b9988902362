//! Error types for reconciliation.
//!
//! Nothing in the engine recovers from an error: every variant aborts the
//! settings group being reconciled and surfaces to the caller unchanged.

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding, diffing or writing remote state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mapped field is absent from the remote object and not marked optional.
    #[error("remote object is missing field '{remote}' (mapped to '{local}')")]
    MissingRemoteField {
        /// Local field name.
        local: String,
        /// Remote (JSON) field name.
        remote: String,
    },

    /// The remote API answered with a non-2xx status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The request never produced an HTTP response (connection, timeout, TLS).
    #[error("transport error: {message}")]
    Transport {
        /// Underlying error message.
        message: String,
    },

    /// Remote state or a mapping table contradicts an assumption the engine relies on.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// A field value could not be converted between local and remote form.
    #[error("cannot convert field '{field}': {message}")]
    Codec {
        /// Local field name.
        field: String,
        /// Reason.
        message: String,
    },

    /// The API returned JSON of an unexpected shape.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invariant error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// HTTP status code, if this error came from an API response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
