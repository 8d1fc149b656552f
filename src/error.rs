use reqwest::StatusCode;
use thiserror::Error;

/// Failures of a single send.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Endpoint answered with a non-success status. The body is not read.
    #[error("chat endpoint returned {0}")]
    Status(StatusCode),

    /// Request, connection or body read failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
