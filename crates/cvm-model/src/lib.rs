//! # cvm-model
//!
//! Point queries against a gridded 3-D seismic velocity model.
//!
//! A model is a regular grid of Vp and Vs samples laid out in a rotated UTM
//! footprint. Querying a point projects it into the footprint, finds the
//! surrounding grid cell and interpolates. Above the first layer boundary
//! the grid is optionally tapered towards a Vs30 proxy. Density and
//! attenuation are derived from Vs.
//!
//! ## Layout on disk
//!
//! ```text
//! <install>/model/<label>/data/config          key = value settings
//! <install>/model/<label>/data/<model_dir>/vp.dat
//! <install>/model/<label>/data/<model_dir>/vs.dat
//! <install>/model/ucvm/ucvm.e                  Vs30 map
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use cvm_model::{Engine, QueryPoint};
//!
//! let engine = Engine::open("/opt/ucvm", "cvms5")?;
//! let props = engine.query(&[QueryPoint::new(-118.0, 34.0, 0.0)])?;
//! println!("vp {} vs {} rho {}", props[0].vp, props[0].vs, props[0].rho);
//! # Ok::<(), cvm_model::ModelError>(())
//! ```

pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod frame;
pub mod grid;
pub mod gtl;
pub mod interp;
pub mod plugin;
pub mod telemetry;
pub mod types;

pub use config::{Corner, LoadPolicy, ModelConfig, ModelPaths};
pub use engine::{Engine, VERSION};
pub use error::ModelError;
pub use frame::ModelFrame;
pub use grid::{GridField, GridStore};
pub use plugin::{Lifecycle, ModelHandle, VelocityModel};
pub use telemetry::describe_metrics;
pub use types::{Properties, QueryPoint, NOT_FOUND};

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
