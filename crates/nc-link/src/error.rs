//! Error types for plant communication.

use nc_core::CoreError;
use thiserror::Error;

/// Errors raised while reading or writing plant variables.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The endpoint could not be reached at all.
    #[error("Cannot reach plant endpoint {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection failed or timed out mid-request.
    #[error("I/O error talking to plant endpoint: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint answered with a non-success status.
    #[error("Plant endpoint answered {status} for {variable}: {body}")]
    Status {
        variable: String,
        status: u16,
        body: String,
    },

    /// The response could not be understood.
    #[error("Malformed response: {what}")]
    Protocol { what: String },

    /// The link is not available (used by in-memory links to simulate outages).
    #[error("Plant link unavailable: {what}")]
    Unavailable { what: String },

    /// A variable held a value of the wrong shape.
    #[error("Bad plant value: {0}")]
    Value(#[from] CoreError),
}

impl LinkError {
    /// Whether the failure is about connectivity rather than data.
    pub fn is_transport(&self) -> bool {
        !matches!(self, LinkError::Value(_))
    }
}

/// Result type for plant communication.
pub type LinkResult<T> = Result<T, LinkError>;
