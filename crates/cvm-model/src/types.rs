//! Query points and material properties.

use serde::{Deserialize, Serialize};

/// Value reported for a property that could not be determined.
pub const NOT_FOUND: f64 = -1.0;

/// A point to query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    /// Longitude in WGS84 degrees.
    pub longitude: f64,
    /// Latitude in WGS84 degrees.
    pub latitude: f64,
    /// Depth below the surface in meters. Negative depths are data gaps.
    pub depth: f64,
}

impl QueryPoint {
    /// Create a query point.
    pub fn new(longitude: f64, latitude: f64, depth: f64) -> Self {
        Self {
            longitude,
            latitude,
            depth,
        }
    }
}

/// Material properties at a point.
///
/// Velocities are in m/s and density in kg/m^3. Every field is
/// [`NOT_FOUND`] when the point lies outside the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    /// P-wave velocity.
    pub vp: f64,
    /// S-wave velocity.
    pub vs: f64,
    /// Density.
    pub rho: f64,
    /// P-wave quality factor.
    pub qp: f64,
    /// S-wave quality factor.
    pub qs: f64,
}

impl Properties {
    /// All fields [`NOT_FOUND`].
    pub const NOT_FOUND: Properties = Properties {
        vp: NOT_FOUND,
        vs: NOT_FOUND,
        rho: NOT_FOUND,
        qp: NOT_FOUND,
        qs: NOT_FOUND,
    };

    /// Velocities only, derived quantities unset.
    pub fn velocities(vp: f64, vs: f64) -> Self {
        Self {
            vp,
            vs,
            ..Self::NOT_FOUND
        }
    }

    /// True if any field holds a value.
    pub fn is_found(&self) -> bool {
        *self != Self::NOT_FOUND
    }
}

impl Default for Properties {
    fn default() -> Self {
        Self::NOT_FOUND
    }
}
