//! Vs30 map lookup.

use std::fmt;
use std::path::Path;

use cvm_proj::Projection;
use tracing::{debug, trace};

use crate::store::{PointIndex, TickAddr, TickStore, MAX_LEVEL};
use crate::{IndexError, MapMetadata, Result};

/// A Vs30 map: its metadata, its own rotated planar frame and the point
/// index holding the samples.
pub struct Vs30Map {
    meta: MapMetadata,
    projection: Projection,
    index: Box<dyn PointIndex>,
    origin_x: f64,
    origin_y: f64,
    cos_rotation: f64,
    sin_rotation: f64,
    max_level: u32,
    edge_ticks: u32,
    edge_size: f64,
}

impl Vs30Map {
    /// Open a tick store file as a map.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_index(Box::new(TickStore::open(path)?))
    }

    /// Build a map over any point index.
    pub fn from_index(index: Box<dyn PointIndex>) -> Result<Self> {
        let meta = MapMetadata::from_appmeta(index.app_meta())?;
        let projection = Projection::from_proj_string(&meta.projection)?;
        let (origin_x, origin_y) =
            projection.forward(meta.origin.longitude, meta.origin.latitude)?;

        let levels = (meta.dimensions[0] / meta.spacing).log2().ceil();
        if !(0.0..=f64::from(MAX_LEVEL)).contains(&levels) {
            return Err(IndexError::Metadata(format!(
                "x dimension {} and spacing {} give tree level {}",
                meta.dimensions[0], meta.spacing, levels
            )));
        }
        let max_level = levels as u32;
        let edge_ticks = 1u32 << (MAX_LEVEL - max_level);
        let edge_size = meta.dimensions[0] / f64::from(1u32 << max_level);

        let (sin_rotation, cos_rotation) = meta.rotation.to_radians().sin_cos();

        debug!(
            "Vs30 map: spacing {} m, level {}, edge {} m / {} ticks, rotation {} deg",
            meta.spacing, max_level, edge_size, edge_ticks, meta.rotation
        );

        Ok(Self {
            meta,
            projection,
            index,
            origin_x,
            origin_y,
            cos_rotation,
            sin_rotation,
            max_level,
            edge_ticks,
            edge_size,
        })
    }

    /// Parsed metadata.
    pub fn metadata(&self) -> &MapMetadata {
        &self.meta
    }

    /// Map projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Tree level the samples are stored at.
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Size of one sample cell in ticks.
    pub fn edge_ticks(&self) -> u32 {
        self.edge_ticks
    }

    /// Size of one sample cell in meters.
    pub fn edge_size(&self) -> f64 {
        self.edge_size
    }

    /// WGS84 degrees to the map's rotated local frame in meters.
    pub fn to_local(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        let (x, y) = self.projection.forward(lon, lat)?;
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        Ok((
            self.cos_rotation * dx - self.sin_rotation * dy,
            self.sin_rotation * dx + self.cos_rotation * dy,
        ))
    }

    /// Local frame meters back to WGS84 degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let dx = self.cos_rotation * x + self.sin_rotation * y;
        let dy = -self.sin_rotation * x + self.cos_rotation * y;
        Ok(self
            .projection
            .inverse(dx + self.origin_x, dy + self.origin_y)?)
    }

    /// Tick address of a sample cell corner, pulled back inside the map
    /// when it lands on or past the last tick.
    pub fn corner_addr(&self, cell_x: u64, cell_y: u64) -> TickAddr {
        TickAddr::surface(
            self.clamp_tick(cell_x, self.meta.ticks[0]),
            self.clamp_tick(cell_y, self.meta.ticks[1]),
        )
    }

    fn clamp_tick(&self, cell: u64, extent: u32) -> u32 {
        let tick = cell.saturating_mul(u64::from(self.edge_ticks));
        if tick >= u64::from(extent) {
            extent.saturating_sub(self.edge_ticks)
        } else {
            tick as u32
        }
    }

    /// Vs30 at a WGS84 position, or `None` outside the map or where a
    /// sample is missing.
    ///
    /// All four surrounding samples must exist, but only the `y0` pair is
    /// blended, with `p = fmod(x / spacing, spacing) / spacing`:
    /// the result is `p * v(x0, y0) + (1 - p) * v(x1, y0)`.
    pub fn lookup(&self, lon: f64, lat: f64) -> Result<Option<f64>> {
        let (x, y) = self.to_local(lon, lat)?;
        let [x_dim, y_dim, _] = self.meta.dimensions;
        if x < 0.0 || y < 0.0 || x > x_dim || y > y_dim {
            trace!("({}, {}) outside Vs30 map at local ({:.1}, {:.1})", lon, lat, x, y);
            return Ok(None);
        }

        let cell_x = (x / self.edge_size).floor() as u64;
        let cell_y = (y / self.edge_size).floor() as u64;

        let corners = [
            self.corner_addr(cell_x, cell_y),
            self.corner_addr(cell_x + 1, cell_y),
            self.corner_addr(cell_x, cell_y + 1),
            self.corner_addr(cell_x + 1, cell_y + 1),
        ];
        let mut values = [0f32; 4];
        for (value, addr) in values.iter_mut().zip(corners) {
            match self.index.search(addr)? {
                Some(payload) => *value = payload.vs30,
                None => {
                    trace!("Vs30 sample missing at {:?}", addr);
                    return Ok(None);
                }
            }
        }

        let spacing = self.meta.spacing;
        let percent = (x / spacing) % spacing / spacing;
        let vs30 = percent * f64::from(values[0]) + (1.0 - percent) * f64::from(values[1]);
        // Payload precision.
        Ok(Some(f64::from(vs30 as f32)))
    }
}

impl fmt::Debug for Vs30Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vs30Map")
            .field("meta", &self.meta)
            .field("max_level", &self.max_level)
            .field("edge_ticks", &self.edge_ticks)
            .field("edge_size", &self.edge_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{TickStoreWriter, Vs30Payload};
    use approx::assert_abs_diff_eq;

    fn meta(rotation: f64) -> String {
        format!(
            "vs30|test|cvm|2024-01-01|100.0|float surf; float vs30|\
             +proj=aeqd +lat_0=34.0 +lon_0=-118.0 +ellps=WGS84 +units=m +no_defs|\
             -118.0,34.0,0.0|{}|1600.0,1600.0,100.0|2147483648,2147483648,134217728",
            rotation
        )
    }

    fn map(rotation: f64) -> Vs30Map {
        let mut writer = TickStoreWriter::new(meta(rotation));
        for i in 0..16u32 {
            for j in 0..16u32 {
                writer.push(
                    TickAddr::surface(i << 27, j << 27),
                    Vs30Payload {
                        surface: 0.0,
                        vs30: 300.0 + 10.0 * i as f32 + j as f32,
                    },
                );
            }
        }
        Vs30Map::from_index(Box::new(writer.into_store())).unwrap()
    }

    #[test]
    fn test_tree_geometry() {
        let m = map(0.0);
        assert_eq!(m.max_level(), 4);
        assert_eq!(m.edge_ticks(), 1 << 27);
        assert_eq!(m.edge_size(), 100.0);
    }

    #[test]
    fn test_origin_is_local_zero() {
        let m = map(0.0);
        let (x, y) = m.to_local(-118.0, 34.0).unwrap();
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_local_round_trip_with_rotation() {
        let m = map(30.0);
        let (lon, lat) = m.to_geographic(420.0, 1310.0).unwrap();
        let (x, y) = m.to_local(lon, lat).unwrap();
        assert_abs_diff_eq!(x, 420.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y, 1310.0, epsilon = 1e-6);
    }

    #[test]
    fn test_blend_uses_first_row_pair_only() {
        let m = map(0.0);
        // Local (250, 730): cell (2, 7), fraction fmod(2.5, 100) / 100 = 0.025.
        let (lon, lat) = m.to_geographic(250.0, 730.0).unwrap();
        let vs30 = m.lookup(lon, lat).unwrap().unwrap();
        let v0 = 300.0 + 20.0 + 7.0;
        let v1 = 300.0 + 30.0 + 7.0;
        let percent = 0.025;
        assert_abs_diff_eq!(vs30, percent * v0 + (1.0 - percent) * v1, epsilon = 1e-3);
    }

    #[test]
    fn test_on_sample_returns_next_column() {
        // With a zero fraction the whole weight goes to the +x neighbour.
        // The map origin projects to exactly (0, 0).
        let m = map(0.0);
        let vs30 = m.lookup(-118.0, 34.0).unwrap().unwrap();
        assert_eq!(vs30, 310.0);
    }

    #[test]
    fn test_far_edge_clamps_to_last_tick() {
        let m = map(0.0);
        assert_eq!(m.corner_addr(16, 3), TickAddr::surface(15 << 27, 3 << 27));
        assert_eq!(m.corner_addr(15, 16), TickAddr::surface(15 << 27, 15 << 27));

        let (lon, lat) = m.to_geographic(1599.0, 1599.0).unwrap();
        assert!(m.lookup(lon, lat).unwrap().is_some());
    }

    #[test]
    fn test_outside_map() {
        let m = map(0.0);
        let (lon, lat) = m.to_geographic(-10.0, 50.0).unwrap();
        assert_eq!(m.lookup(lon, lat).unwrap(), None);
        let (lon, lat) = m.to_geographic(50.0, 1700.0).unwrap();
        assert_eq!(m.lookup(lon, lat).unwrap(), None);
    }

    #[test]
    fn test_missing_sample_is_not_found() {
        let mut writer = TickStoreWriter::new(meta(0.0));
        writer.push(
            TickAddr::surface(0, 0),
            Vs30Payload {
                surface: 0.0,
                vs30: 500.0,
            },
        );
        let m = Vs30Map::from_index(Box::new(writer.into_store())).unwrap();
        let (lon, lat) = m.to_geographic(20.0, 20.0).unwrap();
        assert_eq!(m.lookup(lon, lat).unwrap(), None);
    }

    #[test]
    fn test_projection_error_propagates() {
        let m = map(0.0);
        assert!(matches!(
            m.lookup(f64::NAN, 34.0),
            Err(IndexError::Projection(_))
        ));
    }
}
