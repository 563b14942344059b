//! Grid fields and cell reads.
//!
//! Vp and Vs are stored as flat files of `nx * ny * nz` little-endian `f32`
//! values. Each field is either absent, resident in memory or streamed from
//! disk one value at a time.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::telemetry::metric_defs;
use crate::types::NOT_FOUND;
use crate::{LoadPolicy, ModelError, Properties, Result};

const VALUE_SIZE: u64 = 4;
const READ_CHUNK: usize = 1 << 16;

/// Storage state of one grid field.
#[derive(Debug)]
pub enum GridField {
    /// No data for this field.
    Absent,
    /// Entire field in memory.
    Resident(Vec<f32>),
    /// Read on demand from an open file.
    Streaming {
        /// Source file, for error reports.
        path: PathBuf,
        /// Open handle; seek and read happen under the lock.
        file: Mutex<File>,
        /// Number of values in the file.
        len: usize,
    },
}

impl GridField {
    /// Open a grid file holding `len` values.
    ///
    /// A missing file gives [`GridField::Absent`]. A file of the wrong size
    /// is an error.
    pub fn open(path: &Path, len: usize, policy: LoadPolicy) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Grid file {} not found", path.display());
                return Ok(Self::Absent);
            }
            Err(e) => return Err(ModelError::resource(path, e)),
        };

        let expected = len as u64 * VALUE_SIZE;
        let actual = file
            .metadata()
            .map_err(|e| ModelError::resource(path, e))?
            .len();
        if actual != expected {
            return Err(ModelError::InvalidGrid {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }

        match policy {
            LoadPolicy::Disk => Ok(Self::streaming(path, file, len)),
            LoadPolicy::Memory => {
                let mut values = Vec::new();
                values
                    .try_reserve_exact(len)
                    .map_err(|e| ModelError::resource(path, io::Error::new(io::ErrorKind::OutOfMemory, e)))?;
                Self::load(path, file, values, len)
            }
            LoadPolicy::Auto => {
                let mut values = Vec::new();
                if values.try_reserve_exact(len).is_err() {
                    warn!(
                        "Could not load {} into memory; reading from disk may be slow",
                        path.display()
                    );
                    return Ok(Self::streaming(path, file, len));
                }
                Self::load(path, file, values, len)
            }
        }
    }

    fn streaming(path: &Path, file: File, len: usize) -> Self {
        debug!("Streaming grid file {}", path.display());
        Self::Streaming {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            len,
        }
    }

    fn load(path: &Path, file: File, mut values: Vec<f32>, len: usize) -> Result<Self> {
        let mut reader = BufReader::new(file);
        let mut chunk = vec![0u8; READ_CHUNK];
        while values.len() < len {
            let want = ((len - values.len()) * VALUE_SIZE as usize).min(READ_CHUNK);
            let buf = &mut chunk[..want];
            reader
                .read_exact(buf)
                .map_err(|e| ModelError::resource(path, e))?;
            values.extend(
                buf.chunks_exact(VALUE_SIZE as usize)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
        }
        debug!("Loaded {} values from {}", len, path.display());
        Ok(Self::Resident(values))
    }

    /// Short state name for logging.
    pub fn state(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Resident(_) => "resident",
            Self::Streaming { .. } => "streaming",
        }
    }

    /// True unless the field is absent.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Value at a linear index, or [`NOT_FOUND`] when absent or out of range.
    pub fn read(&self, index: i64) -> Result<f64> {
        let Ok(index) = usize::try_from(index) else {
            return Ok(NOT_FOUND);
        };
        match self {
            Self::Absent => Ok(NOT_FOUND),
            Self::Resident(values) => Ok(values.get(index).map_or(NOT_FOUND, |v| f64::from(*v))),
            Self::Streaming { path, file, len } => {
                if index >= *len {
                    return Ok(NOT_FOUND);
                }
                metrics::counter!(metric_defs::GRID_DISK_READS.name).increment(1);
                let mut file = file.lock().map_err(|_| ModelError::LockPoisoned)?;
                let mut buf = [0u8; 4];
                let read = file
                    .seek(SeekFrom::Start(index as u64 * VALUE_SIZE))
                    .and_then(|_| file.read_exact(&mut buf));
                match read {
                    Ok(()) => Ok(f64::from(f32::from_le_bytes(buf))),
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(NOT_FOUND),
                    Err(e) => Err(ModelError::resource(path.as_path(), e)),
                }
            }
        }
    }
}

/// The Vp and Vs fields of a model.
#[derive(Debug)]
pub struct GridStore {
    vp: GridField,
    vs: GridField,
    nx: usize,
    ny: usize,
    nz: usize,
}

impl GridStore {
    /// Open `vp.dat` and `vs.dat` in `dir`.
    ///
    /// Fails if neither file exists.
    pub fn open(dir: &Path, nx: usize, ny: usize, nz: usize, policy: LoadPolicy) -> Result<Self> {
        let len = nx * ny * nz;
        let vp = GridField::open(&dir.join("vp.dat"), len, policy)?;
        let vs = GridField::open(&dir.join("vs.dat"), len, policy)?;
        if !vp.is_present() && !vs.is_present() {
            return Err(ModelError::resource(
                dir,
                io::Error::new(io::ErrorKind::NotFound, "no vp.dat or vs.dat grid file"),
            ));
        }
        debug!("Grid fields: vp {}, vs {}", vp.state(), vs.state());
        Ok(Self::from_fields(vp, vs, nx, ny, nz))
    }

    /// Assemble a store from already opened fields.
    pub fn from_fields(vp: GridField, vs: GridField, nx: usize, ny: usize, nz: usize) -> Self {
        Self { vp, vs, nx, ny, nz }
    }

    /// Vp field.
    pub fn vp(&self) -> &GridField {
        &self.vp
    }

    /// Vs field.
    pub fn vs(&self) -> &GridField {
        &self.vs
    }

    /// Grid dimensions.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    /// Linear index of grid point `(x, y, z)`. The x axis is stored reversed.
    pub fn index(&self, x: i64, y: i64, z: i64) -> i64 {
        let nx = self.nx as i64;
        let ny = self.ny as i64;
        z * nx * ny + (nx - 1 - x) * ny + y
    }

    /// Vp and Vs at a grid point. Density and attenuation stay [`NOT_FOUND`].
    pub fn read_cell(&self, x: i64, y: i64, z: i64) -> Result<Properties> {
        let index = self.index(x, y, z);
        Ok(Properties::velocities(self.vp.read(index)?, self.vs.read(index)?))
    }
}
