//! Error types for Attack Flow operations.
//!
//! [`Error`] wraps everything that can stop the library from producing a
//! report. Rule violations are not errors; they are issues in the
//! [`ValidationReport`](crate::validator::ValidationReport).

use std::io;

use thiserror::Error;

use crate::{loader::LoadError, validator::ValidationError};

/// The main error type for Attack Flow operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Validation aborted: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new `Config` error.
    pub fn new_config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
