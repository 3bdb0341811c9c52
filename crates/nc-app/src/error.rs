//! Error types for the nc-app layer.

use std::path::PathBuf;

use nc_controls::ControlError;
use nc_link::LinkError;

/// Application error type wrapping the lower-level crates.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Plant link error: {0}")]
    Link(#[from] LinkError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),
}

impl AppError {
    /// Whether a fresh control session may succeed where this one failed.
    ///
    /// Transport failures and bad or missing plant data end the session but
    /// are worth retrying. Configuration problems will fail the same way
    /// every time.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Link(_) => true,
            AppError::Control(ControlError::MissingKey { .. }) => true,
            AppError::Control(ControlError::InvalidArg { .. }) => false,
            AppError::Config(_) | AppError::ConfigFileRead { .. } => false,
        }
    }
}

/// Result type for nc-app operations.
pub type AppResult<T> = Result<T, AppError>;
