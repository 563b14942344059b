//! Error types for the model engine.

use std::path::PathBuf;

use cvm_proj::ProjError;
use cvm_vs30::IndexError;
use thiserror::Error;

/// Errors that can occur while loading or querying a velocity model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Configuration file could not be used.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required configuration value is absent or zero.
    #[error("Configuration parameter '{0}' is not specified")]
    MissingParameter(&'static str),

    /// A configuration value could not be parsed or is out of range.
    #[error("Invalid value '{value}' for configuration parameter '{key}'")]
    InvalidParameter {
        /// Configuration key.
        key: String,
        /// Raw value.
        value: String,
    },

    /// A model file could not be opened or read.
    #[error("Cannot read {}: {source}", .path.display())]
    Resource {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A grid file does not have the size the configuration implies.
    #[error("Grid file {} is {actual} bytes, expected {expected}", .path.display())]
    InvalidGrid {
        /// Grid file.
        path: PathBuf,
        /// Expected length in bytes.
        expected: u64,
        /// Actual length in bytes.
        actual: u64,
    },

    /// The Vs30 map could not be opened or searched.
    #[error("Vs30 map error: {0}")]
    Index(#[from] IndexError),

    /// A query point could not be projected into the model frame.
    #[error("Cannot transform latitude {latitude}, longitude {longitude}: {source}")]
    Transform {
        /// Latitude of the failing point.
        latitude: f64,
        /// Longitude of the failing point.
        longitude: f64,
        /// Projection failure.
        #[source]
        source: ProjError,
    },

    /// A streaming grid lock was poisoned by a panicking reader.
    #[error("Grid file lock was poisoned")]
    LockPoisoned,

    /// The model has not been initialized.
    #[error("Model is not initialized")]
    NotInitialized,

    /// The model was already initialized.
    #[error("Model is already initialized")]
    AlreadyInitialized,

    /// The model was finalized and cannot be used again.
    #[error("Model has been finalized")]
    Closed,
}

impl ModelError {
    /// Missing or malformed configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::MissingParameter(_) | Self::InvalidParameter { .. }
        )
    }

    /// Model or map data missing or unreadable.
    pub fn is_resource(&self) -> bool {
        match self {
            Self::Resource { .. } | Self::InvalidGrid { .. } | Self::LockPoisoned => true,
            Self::Index(e) => !matches!(e, IndexError::Projection(_)),
            _ => false,
        }
    }

    /// Coordinate projection failure.
    pub fn is_transform(&self) -> bool {
        matches!(
            self,
            Self::Transform { .. } | Self::Index(IndexError::Projection(_))
        )
    }

    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resource {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(key: &str, value: impl ToString) -> Self {
        Self::InvalidParameter {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}
