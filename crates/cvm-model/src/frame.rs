//! Model coordinate frame.
//!
//! Geographic points are projected into the model's UTM zone, translated so
//! the footprint's bottom-left corner is the origin, and rotated so the
//! footprint is axis-aligned. Grid x runs along the footprint width and y
//! along its height.

use cvm_proj::{ProjError, Projection};
use tracing::debug;

use crate::{ModelConfig, ModelError, Result};

/// Integer cell and fractional position of a point inside the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPosition {
    /// Cell index along x (may be outside the grid).
    pub x: i64,
    /// Cell index along y (may be outside the grid).
    pub y: i64,
    /// Fraction across the cell along x.
    pub fx: f64,
    /// Fraction across the cell along y.
    pub fy: f64,
}

/// Vertical layer of a depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    /// Layer index; 0 is the deepest stored layer.
    pub z: i64,
    /// Fraction of the way from layer `z` down to layer `z - 1`.
    pub fz: f64,
}

/// Immutable geometry of a model, computed once from its configuration.
#[derive(Debug, Clone)]
pub struct ModelFrame {
    projection: Projection,
    origin_e: f64,
    origin_n: f64,
    rotation: f64,
    cos_rotation: f64,
    sin_rotation: f64,
    width: f64,
    height: f64,
    nx: usize,
    ny: usize,
    nz: usize,
    depth: f64,
    depth_interval: f64,
}

impl ModelFrame {
    /// Build the frame described by a configuration.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let projection = Projection::utm(config.utm_zone, false, config.datum)
            .map_err(|e| ModelError::invalid("utm_zone", e))?;

        let north = config.top_left.n - config.bottom_left.n;
        let east = config.top_left.e - config.bottom_left.e;
        let rotation = (east / north).atan();
        let (sin_rotation, cos_rotation) = rotation.sin_cos();

        let frame = Self {
            projection,
            origin_e: config.bottom_left.e,
            origin_n: config.bottom_left.n,
            rotation,
            cos_rotation,
            sin_rotation,
            width: config.total_width(),
            height: config.total_height(),
            nx: config.nx,
            ny: config.ny,
            nz: config.nz,
            depth: config.depth,
            depth_interval: config.depth_interval,
        };
        debug!(
            "Model frame: {:.1} m x {:.1} m, rotation {:.4} deg, {}x{}x{} grid",
            frame.width,
            frame.height,
            rotation.to_degrees(),
            frame.nx,
            frame.ny,
            frame.nz
        );
        Ok(frame)
    }

    /// Model projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Footprint rotation in radians.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Footprint width in meters.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Footprint height in meters.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Spacing between grid points along x in meters.
    pub fn x_spacing(&self) -> f64 {
        self.width / (self.nx - 1) as f64
    }

    /// Spacing between grid points along y in meters.
    pub fn y_spacing(&self) -> f64 {
        self.height / (self.ny - 1) as f64
    }

    /// Grid dimensions.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    /// WGS84 degrees to local frame meters.
    pub fn to_local(&self, lon: f64, lat: f64) -> std::result::Result<(f64, f64), ProjError> {
        let (e, n) = self.projection.forward(lon, lat)?;
        let u = e - self.origin_e;
        let v = n - self.origin_n;
        Ok((
            self.cos_rotation * u - self.sin_rotation * v,
            self.sin_rotation * u + self.cos_rotation * v,
        ))
    }

    /// Local frame meters back to WGS84 degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), ProjError> {
        let u = self.cos_rotation * x + self.sin_rotation * y;
        let v = -self.sin_rotation * x + self.cos_rotation * y;
        self.projection.inverse(u + self.origin_e, v + self.origin_n)
    }

    /// Grid cell containing a local position.
    pub fn cell(&self, x: f64, y: f64) -> CellPosition {
        let dx = self.x_spacing();
        let dy = self.y_spacing();
        CellPosition {
            x: floor_index(x / self.width * (self.nx - 1) as f64),
            y: floor_index(y / self.height * (self.ny - 1) as f64),
            fx: (x % dx) / dx,
            fy: (y % dy) / dy,
        }
    }

    /// Layer containing a depth below the surface.
    pub fn layer(&self, depth: f64) -> Layer {
        let interval = self.depth_interval;
        Layer {
            z: floor_index((self.depth / interval - 1.0) - (depth / interval).floor()),
            fz: (depth % interval) / interval,
        }
    }

    /// True if the cell has a full set of neighbours at `+x` and `+y`.
    pub fn contains_cell(&self, cell: &CellPosition) -> bool {
        (0..=self.nx as i64 - 2).contains(&cell.x) && (0..=self.ny as i64 - 2).contains(&cell.y)
    }

    /// True if the layer index is one of the stored layers.
    pub fn contains_layer(&self, z: i64) -> bool {
        (0..self.nz as i64).contains(&z)
    }

    /// Vertical spacing between layers in meters.
    pub fn depth_interval(&self) -> f64 {
        self.depth_interval
    }
}

/// Floor to an index, mapping non-finite input far outside any grid.
fn floor_index(value: f64) -> i64 {
    if value.is_finite() {
        value.floor() as i64
    } else {
        i64::MIN
    }
}
