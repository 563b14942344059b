//! Error types for the projection crate.

use thiserror::Error;

/// Errors that can occur while building or applying a projection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjError {
    /// Input coordinate is not a valid geographic position.
    #[error("Invalid geographic coordinate (lon {lon}, lat {lat})")]
    InvalidCoordinate {
        /// Requested longitude in degrees.
        lon: f64,
        /// Requested latitude in degrees.
        lat: f64,
    },

    /// Coordinate is valid but lies outside the domain of the projection.
    #[error("Coordinate (lon {lon}, lat {lat}) is outside the projection domain")]
    OutOfDomain {
        /// Requested longitude in degrees.
        lon: f64,
        /// Requested latitude in degrees.
        lat: f64,
    },

    /// Planar coordinate could not be inverted.
    #[error("Planar coordinate ({x}, {y}) cannot be inverted")]
    InvalidPlanar {
        /// Easting in meters.
        x: f64,
        /// Northing in meters.
        y: f64,
    },

    /// An iterative solution failed to converge.
    #[error("{0} did not converge")]
    NoConvergence(&'static str),

    /// UTM zone outside 1..=60.
    #[error("Invalid UTM zone {0} (must be 1-60)")]
    InvalidZone(i32),

    /// Projection name in a definition string is not supported.
    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    /// Named ellipsoid or datum is not known.
    #[error("Unknown {kind}: {name}")]
    UnknownReference {
        /// "ellipsoid" or "datum".
        kind: &'static str,
        /// The name given in the definition string.
        name: String,
    },

    /// A required parameter is missing from a definition string.
    #[error("Missing projection parameter: +{0}")]
    MissingParameter(&'static str),

    /// A parameter could not be parsed or is out of range.
    #[error("Invalid projection parameter +{name}={value}")]
    InvalidParameter {
        /// Parameter name without the leading '+'.
        name: String,
        /// Raw parameter value.
        value: String,
    },
}
