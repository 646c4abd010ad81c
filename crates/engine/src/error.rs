//! Error types for the imaging-service client

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the imaging-service client
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {message}")]
    Api { status: u16, message: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("job did not finish within {waited:?}")]
    Timeout { waited: Duration },

    #[error("wait cancelled")]
    Cancelled,

    #[error("core error: {0}")]
    Core(#[from] seasonwatch_core::Error),
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
