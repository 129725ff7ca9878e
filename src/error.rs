//! Error types.

use std::io;

use thiserror::Error;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket or runtime I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
