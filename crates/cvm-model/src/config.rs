//! Model configuration file.
//!
//! The file is plain `key = value` text, one setting per line. Lines that
//! are empty or start with `#` or a space are skipped.
//!
//! ```text
//! utm_zone = 11
//! model_dir = cvms5
//! nx = 1701
//! ny = 851
//! nz = 101
//! depth = 50000
//! depth_interval = 500
//! top_left_corner_e = ...
//! p0 = 1.7407
//! gtl = on
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use cvm_proj::Datum;
use tracing::debug;

use crate::{ModelError, Result};

/// How grid files are brought into the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Load into memory when the allocation succeeds, otherwise stream.
    #[default]
    Auto,
    /// Always load into memory.
    Memory,
    /// Always read from disk on demand.
    Disk,
}

impl FromStr for LoadPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            _ => Err(ModelError::invalid("load_policy", s)),
        }
    }
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Memory => "memory",
            Self::Disk => "disk",
        })
    }
}

/// A planar corner coordinate in the model projection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Corner {
    /// Easting in meters.
    pub e: f64,
    /// Northing in meters.
    pub n: f64,
}

/// Parsed and validated model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// UTM zone of the model projection.
    pub utm_zone: i32,
    /// Directory under `data/` holding the grid files.
    pub model_dir: String,
    /// Grid points along x.
    pub nx: usize,
    /// Grid points along y.
    pub ny: usize,
    /// Grid points along z.
    pub nz: usize,
    /// Total model depth in meters.
    pub depth: f64,
    /// Top-left footprint corner.
    pub top_left: Corner,
    /// Top-right footprint corner.
    pub top_right: Corner,
    /// Bottom-left footprint corner.
    pub bottom_left: Corner,
    /// Bottom-right footprint corner.
    pub bottom_right: Corner,
    /// Vertical spacing between layers in meters.
    pub depth_interval: f64,
    /// Density polynomial coefficients p0..p5.
    pub density_coefficients: [f64; 6],
    /// Whether the Vs30 taper is applied in the top layer.
    pub gtl: bool,
    /// Grid loading policy.
    pub load_policy: LoadPolicy,
    /// Vs30 index location overriding the install default.
    pub vs30_index: Option<PathBuf>,
    /// Datum the corner coordinates are expressed in.
    pub datum: Datum,
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
}

const CORNER_KEYS: [&str; 8] = [
    "top_left_corner_e",
    "top_left_corner_n",
    "top_right_corner_e",
    "top_right_corner_n",
    "bottom_left_corner_e",
    "bottom_left_corner_n",
    "bottom_right_corner_e",
    "bottom_right_corner_n",
];

const DENSITY_KEYS: [&str; 6] = ["p0", "p1", "p2", "p3", "p4", "p5"];

impl ModelConfig {
    /// Read and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| ModelError::resource(path, e))?;
        let mut config = Self::parse(&text)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = Self::empty();
        let mut corners = [0.0f64; 8];

        for line in text.lines() {
            if line.is_empty() || line.starts_with('#') || line.starts_with(' ') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                debug!("Skipping configuration line without '=': {}", line);
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            if let Some(i) = CORNER_KEYS.iter().position(|k| *k == key) {
                corners[i] = parse_float(key, value)?;
                continue;
            }
            if let Some(i) = DENSITY_KEYS.iter().position(|k| *k == key) {
                config.density_coefficients[i] = parse_float(key, value)?;
                continue;
            }

            match key {
                "utm_zone" => config.utm_zone = parse_int(key, value)?,
                "model_dir" => config.model_dir = value.to_string(),
                "nx" => config.nx = parse_int(key, value)?,
                "ny" => config.ny = parse_int(key, value)?,
                "nz" => config.nz = parse_int(key, value)?,
                "depth" => config.depth = parse_float(key, value)?,
                "depth_interval" => config.depth_interval = parse_float(key, value)?,
                "gtl" => config.gtl = value == "on",
                "load_policy" => config.load_policy = value.parse()?,
                "vs30_index" => config.vs30_index = Some(PathBuf::from(value)),
                "datum" => {
                    config.datum =
                        Datum::by_name(value).ok_or_else(|| ModelError::invalid(key, value))?
                }
                _ => debug!("Ignoring unknown configuration key '{}'", key),
            }
        }

        let corner = |i: usize| Corner {
            e: corners[2 * i],
            n: corners[2 * i + 1],
        };
        config.top_left = corner(0);
        config.top_right = corner(1);
        config.bottom_left = corner(2);
        config.bottom_right = corner(3);

        config.validate()?;
        Ok(config)
    }

    /// Check that every required value was given.
    ///
    /// A value of exactly zero counts as missing.
    pub fn validate(&self) -> Result<()> {
        if self.utm_zone == 0 {
            return Err(ModelError::MissingParameter("utm_zone"));
        }
        for (key, n) in [("nx", self.nx), ("ny", self.ny), ("nz", self.nz)] {
            if n == 0 {
                return Err(ModelError::MissingParameter(key));
            }
            if n < 2 {
                return Err(ModelError::invalid(key, n));
            }
        }
        if self.model_dir.is_empty() {
            return Err(ModelError::MissingParameter("model_dir"));
        }

        let corners = [
            self.top_left.e,
            self.top_left.n,
            self.top_right.e,
            self.top_right.n,
            self.bottom_left.e,
            self.bottom_left.n,
            self.bottom_right.e,
            self.bottom_right.n,
        ];
        for (key, value) in CORNER_KEYS.into_iter().zip(corners) {
            if value == 0.0 {
                return Err(ModelError::MissingParameter(key));
            }
        }

        if self.depth == 0.0 {
            return Err(ModelError::MissingParameter("depth"));
        }
        if self.depth_interval == 0.0 {
            return Err(ModelError::MissingParameter("depth_interval"));
        }
        if self.depth_interval < 0.0 {
            return Err(ModelError::invalid("depth_interval", self.depth_interval));
        }
        for (key, value) in DENSITY_KEYS.into_iter().zip(self.density_coefficients) {
            if value == 0.0 {
                return Err(ModelError::MissingParameter(key));
            }
        }
        Ok(())
    }

    /// Width between the left and right edges of the footprint in meters.
    pub fn total_width(&self) -> f64 {
        (self.top_right.n - self.top_left.n).hypot(self.top_right.e - self.top_left.e)
    }

    /// Height between the bottom and top edges of the footprint in meters.
    pub fn total_height(&self) -> f64 {
        (self.top_left.n - self.bottom_left.n).hypot(self.top_left.e - self.bottom_left.e)
    }

    /// Number of points in one grid field.
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    fn empty() -> Self {
        Self {
            utm_zone: 0,
            model_dir: String::new(),
            nx: 0,
            ny: 0,
            nz: 0,
            depth: 0.0,
            top_left: Corner::default(),
            top_right: Corner::default(),
            bottom_left: Corner::default(),
            bottom_right: Corner::default(),
            depth_interval: 0.0,
            density_coefficients: [0.0; 6],
            gtl: false,
            load_policy: LoadPolicy::Auto,
            vs30_index: None,
            datum: Datum::NAD27,
            source: None,
        }
    }
}

/// Install-relative locations of a model's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    /// `<install>/model/<label>/data/config`.
    pub config: PathBuf,
    /// `<install>/model/<label>/data`.
    pub data_dir: PathBuf,
    /// `<install>/model/ucvm/ucvm.e`.
    pub vs30_index: PathBuf,
}

impl ModelPaths {
    /// Standard layout for model `label` under `install`.
    pub fn new<P: AsRef<Path>>(install: P, label: &str) -> Self {
        let model_root = install.as_ref().join("model");
        let data_dir = model_root.join(label).join("data");
        Self {
            config: data_dir.join("config"),
            vs30_index: model_root.join("ucvm").join("ucvm.e"),
            data_dir,
        }
    }

    /// Directory holding `vp.dat` and `vs.dat`.
    pub fn grid_dir(&self, config: &ModelConfig) -> PathBuf {
        self.data_dir.join(&config.model_dir)
    }

    /// Vs30 index to use, honouring a `vs30_index` override.
    ///
    /// A relative override is resolved against the data directory.
    pub fn vs30_index(&self, config: &ModelConfig) -> PathBuf {
        match &config.vs30_index {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.data_dir.join(path),
            None => self.vs30_index.clone(),
        }
    }
}

fn parse_float(key: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ModelError::invalid(key, value))
}

fn parse_int<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| ModelError::invalid(key, value))
}
