//! CLI-specific error types

use thiserror::Error;

/// Errors raised before any request is sent.
///
/// Failures from the pipeline itself stay `fridge_session::Error` and are
/// wrapped with context in `main`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("path must start with '/', got: {0}")]
    InvalidPath(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("FRIDGE_PASSWORD must be set to log in")]
    MissingPassword,
}

/// Result alias using CLI Error
pub type Result<T> = std::result::Result<T, Error>;
