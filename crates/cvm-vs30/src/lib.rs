//! # cvm-vs30
//!
//! Vs30 near-surface correction map.
//!
//! A Vs30 map is a regular grid of shallow shear-velocity samples laid out
//! in its own rotated planar frame. Samples live in a point index keyed by
//! quantized tick addresses ([`TickAddr`]); the index also carries the
//! metadata string describing the map's projection, origin, rotation and
//! extent.
//!
//! ```no_run
//! use cvm_vs30::Vs30Map;
//!
//! let map = Vs30Map::open("model/ucvm/ucvm.e")?;
//! if let Some(vs30) = map.lookup(-118.0, 34.0)? {
//!     println!("Vs30: {} m/s", vs30);
//! }
//! # Ok::<(), cvm_vs30::IndexError>(())
//! ```

mod error;
mod map;
mod meta;
mod store;

pub use error::IndexError;
pub use map::Vs30Map;
pub use meta::{MapMetadata, MapOrigin};
pub use store::{
    PointIndex, TickAddr, TickStore, TickStoreWriter, Vs30Payload, MAX_LEVEL, TICK_STORE_MAGIC,
};

/// Result type for Vs30 map operations.
pub type Result<T> = std::result::Result<T, IndexError>;
