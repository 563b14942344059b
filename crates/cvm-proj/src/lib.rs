//! # cvm-proj
//!
//! Coordinate reference transforms for gridded velocity models.
//!
//! Velocity models are laid out on planar grids (usually a UTM zone on the
//! NAD27 datum), while queries arrive as WGS84 longitude/latitude. This crate
//! implements the handful of projections the model family needs directly,
//! without linking a native projection library:
//!
//! - **Transverse Mercator / UTM** using the 6th-order Krüger series
//! - **Azimuthal Equidistant** on the ellipsoid (geodesic distance + azimuth)
//! - **Datums** as an ellipsoid plus a three-parameter shift to WGS84
//!
//! Projections are normally built from PROJ.4-style definition strings, the
//! format model metadata is distributed in.
//!
//! ## Example
//!
//! ```
//! use cvm_proj::Projection;
//!
//! let utm = Projection::from_proj_string("+proj=utm +zone=38 +datum=WGS84 +units=m +no_defs")?;
//! let (easting, northing) = utm.forward(44.4, 33.3)?;
//! assert!((easting - 444_140.54).abs() < 0.01);
//! assert!((northing - 3_684_706.36).abs() < 0.01);
//! # Ok::<(), cvm_proj::ProjError>(())
//! ```

mod aeqd;
mod datum;
mod error;
mod projection;
mod tmerc;

pub use aeqd::AzimuthalEquidistant;
pub use datum::{Datum, Ellipsoid};
pub use error::ProjError;
pub use projection::Projection;
pub use tmerc::TransverseMercator;

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjError>;

/// Rejects non-finite input and latitudes beyond the poles.
pub(crate) fn check_geographic(lon: f64, lat: f64) -> Result<()> {
    if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
        return Err(ProjError::InvalidCoordinate { lon, lat });
    }
    Ok(())
}
