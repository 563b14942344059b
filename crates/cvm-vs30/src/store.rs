//! Point-index storage keyed by quantized tick addresses.
//!
//! [`PointIndex`] is the lookup seam the map uses. [`TickStore`] is the
//! crate's own file-backed implementation:
//!
//! ```text
//! magic    8 bytes   "CVMTICK1"
//! meta_len u32 LE
//! meta     meta_len bytes, UTF-8
//! count    u64 LE
//! records  count x { x: u32, y: u32, z: u32, surface: f32, vs30: f32 } (LE)
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::{IndexError, Result};

/// Finest level of the tick address space; addresses are full 32-bit ticks.
pub const MAX_LEVEL: u32 = 31;

/// File magic for tick stores.
pub const TICK_STORE_MAGIC: &[u8; 8] = b"CVMTICK1";

const RECORD_SIZE: usize = 20;

/// Address of a sample in tick units at [`MAX_LEVEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickAddr {
    /// X tick.
    pub x: u32,
    /// Y tick.
    pub y: u32,
    /// Z tick.
    pub z: u32,
}

impl TickAddr {
    /// Surface address (z = 0).
    pub fn surface(x: u32, y: u32) -> Self {
        Self { x, y, z: 0 }
    }
}

/// Value stored at each sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vs30Payload {
    /// Surface elevation in meters.
    pub surface: f32,
    /// Time-averaged shear velocity over the top 30 m, in m/s.
    pub vs30: f32,
}

/// Key to payload lookup used by [`crate::Vs30Map`].
pub trait PointIndex: Send + Sync {
    /// Exact-match lookup of a sample.
    fn search(&self, addr: TickAddr) -> Result<Option<Vs30Payload>>;

    /// Application metadata string describing the map.
    fn app_meta(&self) -> &str;
}

/// In-memory point index loaded from a tick store file.
#[derive(Debug, Clone)]
pub struct TickStore {
    meta: String,
    points: HashMap<TickAddr, Vs30Payload>,
}

impl TickStore {
    /// Load a tick store file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let store = Self::from_reader(BufReader::new(file))?;
        debug!(
            "Loaded tick store {} with {} samples",
            path.display(),
            store.len()
        );
        Ok(store)
    }

    /// Read a tick store from any byte stream.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let magic: [u8; 8] = read_array(&mut reader, "magic")?;
        if &magic != TICK_STORE_MAGIC {
            return Err(IndexError::Format("bad magic".to_string()));
        }

        let meta_len = u32::from_le_bytes(read_array(&mut reader, "metadata length")?) as usize;
        let mut meta = vec![0u8; meta_len];
        read_exact(&mut reader, &mut meta, "metadata")?;
        let meta = String::from_utf8(meta)
            .map_err(|_| IndexError::Format("metadata is not valid UTF-8".to_string()))?;

        let count = u64::from_le_bytes(read_array(&mut reader, "record count")?);
        let count = usize::try_from(count)
            .map_err(|_| IndexError::Format(format!("record count {} too large", count)))?;

        // Cap the preallocation so a corrupt count cannot exhaust memory
        // before the truncation is noticed.
        let mut points = HashMap::with_capacity(count.min(1 << 20));
        for _ in 0..count {
            let record: [u8; RECORD_SIZE] = read_array(&mut reader, "record")?;
            let word = |i: usize| [record[i], record[i + 1], record[i + 2], record[i + 3]];
            let addr = TickAddr {
                x: u32::from_le_bytes(word(0)),
                y: u32::from_le_bytes(word(4)),
                z: u32::from_le_bytes(word(8)),
            };
            let payload = Vs30Payload {
                surface: f32::from_le_bytes(word(12)),
                vs30: f32::from_le_bytes(word(16)),
            };
            points.insert(addr, payload);
        }

        Ok(Self { meta, points })
    }

    /// Build a store directly from samples. Later duplicates replace earlier ones.
    pub fn from_points<I>(meta: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (TickAddr, Vs30Payload)>,
    {
        Self {
            meta: meta.into(),
            points: points.into_iter().collect(),
        }
    }

    /// Number of distinct samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the store holds no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl PointIndex for TickStore {
    fn search(&self, addr: TickAddr) -> Result<Option<Vs30Payload>> {
        Ok(self.points.get(&addr).copied())
    }

    fn app_meta(&self) -> &str {
        &self.meta
    }
}

/// Accumulates samples and writes them out as a tick store.
#[derive(Debug, Clone, Default)]
pub struct TickStoreWriter {
    meta: String,
    records: Vec<(TickAddr, Vs30Payload)>,
}

impl TickStoreWriter {
    /// Start a store carrying the given metadata string.
    pub fn new(meta: impl Into<String>) -> Self {
        Self {
            meta: meta.into(),
            records: Vec::new(),
        }
    }

    /// Add a sample.
    pub fn push(&mut self, addr: TickAddr, payload: Vs30Payload) {
        self.records.push((addr, payload));
    }

    /// Number of samples pushed so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no samples were pushed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize to a byte stream.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let meta_len = u32::try_from(self.meta.len())
            .map_err(|_| IndexError::Format("metadata longer than 4 GiB".to_string()))?;

        writer.write_all(TICK_STORE_MAGIC)?;
        writer.write_all(&meta_len.to_le_bytes())?;
        writer.write_all(self.meta.as_bytes())?;
        writer.write_all(&(self.records.len() as u64).to_le_bytes())?;
        for (addr, payload) in &self.records {
            writer.write_all(&addr.x.to_le_bytes())?;
            writer.write_all(&addr.y.to_le_bytes())?;
            writer.write_all(&addr.z.to_le_bytes())?;
            writer.write_all(&payload.surface.to_le_bytes())?;
            writer.write_all(&payload.vs30.to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the store to a file, replacing any existing one.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_to(BufWriter::new(file))
    }

    /// Convert into an in-memory store without touching disk.
    pub fn into_store(self) -> TickStore {
        TickStore::from_points(self.meta, self.records)
    }
}

fn read_array<R: Read, const N: usize>(reader: &mut R, what: &str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    read_exact(reader, &mut buf, what)?;
    Ok(buf)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => IndexError::Format(format!("truncated {}", what)),
        _ => IndexError::Io(e),
    })
}
