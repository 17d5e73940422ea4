//! Error types shared across the index crates.

use thiserror::Error;

/// Errors raised while building shared types or loading settings.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
