//! Error types for Feedbar
//!
//! This module defines the error type used at the persistence and
//! configuration boundary. We use thiserror for convenient error type
//! definitions.
//!
//! Note that the engine itself does not produce errors in steady state:
//! structural assumptions about the host page that turn out to be wrong are
//! recovered locally by degrading to defaults, never by failing the attach.
//! Errors only exist where the engine touches the settings store.

use thiserror::Error;

/// Main error type for Feedbar
#[derive(Error, Debug)]
pub enum FeedbarError {
    /// Settings storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Results in Feedbar
pub type Result<T> = std::result::Result<T, FeedbarError>;
