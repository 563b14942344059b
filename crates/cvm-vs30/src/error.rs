//! Error types for the Vs30 map crate.

use cvm_proj::ProjError;
use thiserror::Error;

/// Errors that can occur when opening or querying a Vs30 map.
#[derive(Debug, Error)]
pub enum IndexError {
    /// I/O error reading or writing the index file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The index file is not a valid tick store.
    #[error("Invalid tick store: {0}")]
    Format(String),

    /// The application metadata string could not be parsed.
    #[error("Invalid map metadata: {0}")]
    Metadata(String),

    /// The map projection could not be built or applied.
    #[error("Map projection error: {0}")]
    Projection(#[from] ProjError),
}
