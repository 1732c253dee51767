//! Error types for cytosol-script

use thiserror::Error;

/// Program loading error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid program: {0}")]
    Invalid(#[from] cytosol_core::Error),

    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
