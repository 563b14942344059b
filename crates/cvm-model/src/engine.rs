//! Query engine.
//!
//! An [`Engine`] owns everything a model needs after loading: its
//! configuration, frame, grid and optional Vs30 map. It is immutable and
//! can be shared between threads.

use std::path::Path;

use cvm_vs30::{IndexError, Vs30Map};
use tracing::{debug, error, trace, warn};

use crate::derived::{self, DensityScaling};
use crate::frame::{CellPosition, Layer, ModelFrame};
use crate::grid::GridStore;
use crate::gtl::GtlWeights;
use crate::interp::{bilerp, trilerp};
use crate::telemetry::metric_defs;
use crate::{ModelConfig, ModelError, ModelPaths, Properties, QueryPoint, Result};

/// Model family name reported by [`Engine::version`].
pub const VERSION: &str = "CVM-S5";

/// How a single point was resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Found(Properties),
    DataGap,
    OutOfBounds,
    NoCorrection,
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Found(_) => "found",
            Outcome::DataGap => "data_gap",
            Outcome::OutOfBounds => "out_of_bounds",
            Outcome::NoCorrection => "no_correction",
        }
    }

    fn into_properties(self) -> Properties {
        match self {
            Outcome::Found(props) => props,
            _ => Properties::NOT_FOUND,
        }
    }
}

/// A loaded velocity model.
#[derive(Debug)]
pub struct Engine {
    config: ModelConfig,
    frame: ModelFrame,
    grid: GridStore,
    vs30: Option<Vs30Map>,
    gtl: GtlWeights,
    density: DensityScaling,
}

impl Engine {
    /// Load model `label` from an install tree.
    ///
    /// Reads `<install>/model/<label>/data/config`, opens the grid files and,
    /// when the taper is on, the Vs30 map.
    pub fn open<P: AsRef<Path>>(install: P, label: &str) -> Result<Self> {
        let paths = ModelPaths::new(install, label);
        debug!("Loading model '{}' from {}", label, paths.config.display());

        let config = ModelConfig::from_file(&paths.config)?;
        let grid = GridStore::open(
            &paths.grid_dir(&config),
            config.nx,
            config.ny,
            config.nz,
            config.load_policy,
        )?;

        let vs30 = if config.gtl {
            let index = paths.vs30_index(&config);
            debug!("Opening Vs30 map {}", index.display());
            Some(Vs30Map::open(&index)?)
        } else {
            if let Some(index) = &config.vs30_index {
                warn!(
                    "Near-surface taper is off; not loading Vs30 map {}",
                    index.display()
                );
            }
            None
        };

        Self::from_parts(config, grid, vs30)
    }

    /// Assemble an engine from loaded parts.
    pub fn from_parts(config: ModelConfig, grid: GridStore, vs30: Option<Vs30Map>) -> Result<Self> {
        config.validate()?;
        if grid.dimensions() != (config.nx, config.ny, config.nz) {
            let (nx, ny, nz) = grid.dimensions();
            return Err(ModelError::Config(format!(
                "grid is {}x{}x{} but configuration expects {}x{}x{}",
                nx, ny, nz, config.nx, config.ny, config.nz
            )));
        }
        if config.gtl && vs30.is_none() {
            return Err(ModelError::Config(
                "near-surface taper is on but no Vs30 map was given".to_string(),
            ));
        }

        let frame = ModelFrame::from_config(&config)?;
        let density = DensityScaling::new(config.density_coefficients);
        Ok(Self {
            config,
            frame,
            grid,
            vs30,
            gtl: GtlWeights::default(),
            density,
        })
    }

    /// Query a batch of points.
    ///
    /// Points outside the model come back as [`Properties::NOT_FOUND`]. A
    /// point that cannot be projected fails the whole batch.
    pub fn query(&self, points: &[QueryPoint]) -> Result<Vec<Properties>> {
        metrics::counter!(metric_defs::QUERY_BATCHES.name).increment(1);
        metrics::histogram!(metric_defs::QUERY_BATCH_SIZE.name).record(points.len() as f64);
        points.iter().map(|p| self.query_point(p)).collect()
    }

    /// Query one point.
    pub fn query_point(&self, point: &QueryPoint) -> Result<Properties> {
        let outcome = self.resolve(point)?;
        trace!(
            "({}, {}, {}) -> {}",
            point.longitude,
            point.latitude,
            point.depth,
            outcome.label()
        );
        metrics::counter!(metric_defs::QUERY_POINTS.name, metric_defs::OUTCOME => outcome.label())
            .increment(1);
        Ok(outcome.into_properties())
    }

    fn resolve(&self, point: &QueryPoint) -> Result<Outcome> {
        if point.depth < 0.0 || point.depth.is_nan() {
            return Ok(Outcome::DataGap);
        }

        let (x, y) = self
            .frame
            .to_local(point.longitude, point.latitude)
            .map_err(|source| {
                error!(
                    "Cannot transform ({}, {}) into the model frame: {}",
                    point.longitude, point.latitude, source
                );
                ModelError::Transform {
                    latitude: point.latitude,
                    longitude: point.longitude,
                    source,
                }
            })?;
        let cell = self.frame.cell(x, y);
        let layer = self.frame.layer(point.depth);

        if !self.frame.contains_cell(&cell) {
            return Ok(Outcome::OutOfBounds);
        }

        let on_plane = layer.z == 0 && layer.fz == 0.0;
        let mut props = if self.config.gtl && !on_plane && point.depth < self.frame.depth_interval()
        {
            if !self.has_layer_below(layer.z) {
                return Ok(Outcome::OutOfBounds);
            }
            match self.taper(point, &cell)? {
                Outcome::Found(props) => props,
                other => return Ok(other),
            }
        } else {
            match self.sample(&cell, &layer)? {
                Some(props) => props,
                None => return Ok(Outcome::OutOfBounds),
            }
        };

        derived::apply(&mut props, &self.density);
        Ok(Outcome::Found(props))
    }

    /// Grid velocities at an in-bounds cell, or `None` when the layer has no
    /// layer below it.
    fn sample(&self, cell: &CellPosition, layer: &Layer) -> Result<Option<Properties>> {
        if layer.z == 0 && layer.fz == 0.0 {
            return self.surface_plane(cell, layer.z).map(Some);
        }
        if !self.has_layer_below(layer.z) {
            return Ok(None);
        }
        self.interpolate(cell, layer).map(Some)
    }

    fn has_layer_below(&self, z: i64) -> bool {
        z >= 1 && self.frame.contains_layer(z)
    }

    fn surface_plane(&self, cell: &CellPosition, z: i64) -> Result<Properties> {
        let (x, y) = (cell.x, cell.y);
        let corners = [
            self.grid.read_cell(x, y, z)?,
            self.grid.read_cell(x + 1, y, z)?,
            self.grid.read_cell(x, y + 1, z)?,
            self.grid.read_cell(x + 1, y + 1, z)?,
        ];
        Ok(bilerp(cell.fx, cell.fy, &corners))
    }

    fn interpolate(&self, cell: &CellPosition, layer: &Layer) -> Result<Properties> {
        let (x, y, z) = (cell.x, cell.y, layer.z);
        let corners = [
            self.grid.read_cell(x, y, z)?,
            self.grid.read_cell(x + 1, y, z)?,
            self.grid.read_cell(x, y + 1, z)?,
            self.grid.read_cell(x + 1, y + 1, z)?,
            self.grid.read_cell(x, y, z - 1)?,
            self.grid.read_cell(x + 1, y, z - 1)?,
            self.grid.read_cell(x, y + 1, z - 1)?,
            self.grid.read_cell(x + 1, y + 1, z - 1)?,
        ];
        Ok(trilerp(cell.fx, cell.fy, layer.fz, &corners))
    }

    /// Grid value at the first layer boundary below the point, blended with
    /// the Vs30 proxy. The boundary value is what a query at
    /// `depth = depth_interval` returns before derived properties.
    fn taper(&self, point: &QueryPoint, cell: &CellPosition) -> Result<Outcome> {
        let interval = self.frame.depth_interval();
        let Some(deep) = self.sample(cell, &self.frame.layer(interval))? else {
            return Ok(Outcome::OutOfBounds);
        };

        let Some(map) = &self.vs30 else {
            return Ok(Outcome::NoCorrection);
        };
        let vs30 = map
            .lookup(point.longitude, point.latitude)
            .map_err(|e| match e {
                IndexError::Projection(source) => ModelError::Transform {
                    latitude: point.latitude,
                    longitude: point.longitude,
                    source,
                },
                other => ModelError::Index(other),
            })?;
        let Some(vs30) = vs30 else {
            return Ok(Outcome::NoCorrection);
        };

        let p = point.depth / interval;
        Ok(self
            .gtl
            .blend(p, &deep, vs30)
            .map_or(Outcome::NoCorrection, Outcome::Found))
    }

    /// Model family name.
    pub fn version(&self) -> &'static str {
        VERSION
    }

    /// `config = <path>` line describing where the configuration came from.
    pub fn describe_config(&self) -> String {
        let path = self
            .config
            .source
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        format!("config = {}\n", path)
    }

    /// Loaded configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Model geometry.
    pub fn frame(&self) -> &ModelFrame {
        &self.frame
    }

    /// Grid fields.
    pub fn grid(&self) -> &GridStore {
        &self.grid
    }

    /// Vs30 map, present when the taper is on.
    pub fn vs30(&self) -> Option<&Vs30Map> {
        self.vs30.as_ref()
    }

    /// Taper coefficients.
    pub fn gtl_weights(&self) -> &GtlWeights {
        &self.gtl
    }

    /// Density scaling.
    pub fn density(&self) -> &DensityScaling {
        &self.density
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridField;
    use approx::assert_abs_diff_eq;

    const CONFIG: &str = "\
utm_zone = 11
model_dir = grid
nx = 4
ny = 3
nz = 5
depth = 2500
depth_interval = 500
top_left_corner_e = 400000
top_left_corner_n = 3761000
top_right_corner_e = 403000
top_right_corner_n = 3761000
bottom_left_corner_e = 400000
bottom_left_corner_n = 3759000
bottom_right_corner_e = 403000
bottom_right_corner_n = 3759000
p0 = 1.7407
p1 = -0.871
p2 = 0.3486
p3 = -0.0687
p4 = 0.0055
p5 = 1e-9
gtl = off
";

    /// Vs grows with depth: 1000 m/s per layer below the surface plus x and y ramps.
    fn vs_at(x: i64, y: i64, z: i64) -> f32 {
        (1000 * (4 - z) + 10 * x + y + 500) as f32
    }

    fn engine() -> Engine {
        let config = ModelConfig::parse(CONFIG).unwrap();
        let (nx, ny, nz) = (4i64, 3i64, 5i64);
        let mut vs = vec![0f32; (nx * ny * nz) as usize];
        let store = GridStore::from_fields(GridField::Absent, GridField::Absent, 4, 3, 5);
        for z in 0..nz {
            for x in 0..nx {
                for y in 0..ny {
                    vs[store.index(x, y, z) as usize] = vs_at(x, y, z);
                }
            }
        }
        let vp = vs.iter().map(|v| 2.0 * v).collect();
        let grid = GridStore::from_fields(GridField::Resident(vp), GridField::Resident(vs), 4, 3, 5);
        Engine::from_parts(config, grid, None).unwrap()
    }

    fn point_at(engine: &Engine, x: f64, y: f64, depth: f64) -> QueryPoint {
        let (lon, lat) = engine.frame().to_geographic(x, y).unwrap();
        QueryPoint::new(lon, lat, depth)
    }

    #[test]
    fn test_trilinear_inside() {
        let engine = engine();
        let props = engine
            .query_point(&point_at(&engine, 1500.0, 500.0, 750.0))
            .unwrap();
        // Cell (1, 0), fractions (0.5, 0.5), halfway between layers 3 and 2.
        assert_abs_diff_eq!(props.vs, 2015.5, epsilon = 1e-3);
        assert_abs_diff_eq!(props.vp, 4031.0, epsilon = 2e-3);
        assert_eq!(props.rho, engine.density().density(props.vs));
        assert_abs_diff_eq!(props.qs, props.vs * 0.10, epsilon = 1e-12);
        assert_abs_diff_eq!(props.qp, 1.5 * props.qs, epsilon = 1e-12);
    }

    #[test]
    fn test_data_gap() {
        let engine = engine();
        for depth in [-1.0, f64::NAN] {
            let props = engine
                .query_point(&point_at(&engine, 1500.0, 500.0, depth))
                .unwrap();
            assert_eq!(props, Properties::NOT_FOUND);
        }
    }

    #[test]
    fn test_horizontal_bounds() {
        let engine = engine();
        // x = 3000 m is grid column nx - 1.
        for (x, y) in [(3000.5, 500.0), (-10.0, 500.0), (1500.0, 2000.5), (1500.0, -10.0)] {
            let props = engine.query_point(&point_at(&engine, x, y, 100.0)).unwrap();
            assert_eq!(props, Properties::NOT_FOUND, "({}, {})", x, y);
        }
    }

    #[test]
    fn test_deepest_layer_uses_plane() {
        let engine = engine();
        // Depth 2000 m is layer 0 exactly.
        let props = engine
            .query_point(&point_at(&engine, 1500.0, 500.0, 2000.0))
            .unwrap();
        assert_abs_diff_eq!(props.vs, 4515.5, epsilon = 1e-3);

        // Anything deeper has no layer below it.
        let props = engine
            .query_point(&point_at(&engine, 1500.0, 500.0, 2100.0))
            .unwrap();
        assert_eq!(props, Properties::NOT_FOUND);
    }

    #[test]
    fn test_batch_keeps_order() {
        let engine = engine();
        let points = [
            point_at(&engine, 1500.0, 500.0, 750.0),
            point_at(&engine, 1500.0, 500.0, -1.0),
            point_at(&engine, 100.0, 100.0, 0.0),
        ];
        let props = engine.query(&points).unwrap();
        assert_eq!(props.len(), 3);
        assert!(props[0].is_found());
        assert!(!props[1].is_found());
        assert!(props[2].is_found());
    }

    #[test]
    fn test_transform_failure_aborts_batch() {
        let engine = engine();
        let points = [
            point_at(&engine, 1500.0, 500.0, 750.0),
            QueryPoint::new(-118.0, 95.0, 0.0),
        ];
        let err = engine.query(&points).unwrap_err();
        assert!(err.is_transform());
    }

    #[test]
    fn test_taper_needs_map() {
        let config = ModelConfig::parse(&CONFIG.replace("gtl = off", "gtl = on")).unwrap();
        let grid = GridStore::from_fields(GridField::Resident(vec![1.0; 60]), GridField::Absent, 4, 3, 5);
        let err = Engine::from_parts(config, grid, None).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_grid_shape_must_match() {
        let config = ModelConfig::parse(CONFIG).unwrap();
        let grid = GridStore::from_fields(GridField::Absent, GridField::Absent, 4, 3, 4);
        assert!(Engine::from_parts(config, grid, None).unwrap_err().is_config());
    }

    #[test]
    fn test_metadata() {
        let engine = engine();
        assert_eq!(engine.version(), "CVM-S5");
        assert_eq!(engine.describe_config(), "config = \n");
    }
}
