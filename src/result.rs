//! Error types that can be emitted from this library

use std::io;

use thiserror::Error;

/// Generic result type with ZipError as its error variant
pub type ZipResult<T> = Result<T, ZipError>;

/// Error type for Zip
#[derive(Debug, Error)]
pub enum ZipError {
    /// An error caused by I/O
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The request cannot produce a valid archive
    #[error("invalid Zip archive: {0}")]
    InvalidArchive(&'static str),
}
