//! Error taxonomy shared by the packer and extractor.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Precondition or I/O failure: wrong destination suffix, unset
    /// recording fields, unreadable dataset, malformed container structure.
    #[error("File error: {0}")]
    File(String),
    /// Metadata failed validation before packing.
    #[error("Validation error: {0}")]
    Validation(String),
    /// An extracted metadata entry did not parse as JSON.
    #[error("Format error: {0}")]
    Format(String),
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        ArchiveError::File(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
