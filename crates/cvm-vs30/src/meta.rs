//! Application metadata carried by a Vs30 index.
//!
//! The metadata is a single string of eleven `|` separated fields:
//!
//! ```text
//! type|description|author|date|spacing|schema|projection|lon,lat,depth|rotation|xdim,ydim,zdim|xticks,yticks,zticks
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{IndexError, Result};

const FIELD_COUNT: usize = 11;

/// Geographic origin of the map (bottom-left corner before rotation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapOrigin {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Depth in meters.
    pub depth: f64,
}

/// Parsed Vs30 map metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMetadata {
    /// Dataset type tag.
    pub kind: String,
    /// Free-form description.
    pub description: String,
    /// Author.
    pub author: String,
    /// Creation date.
    pub date: String,
    /// Sample spacing in meters.
    pub spacing: f64,
    /// Payload schema description.
    pub schema: String,
    /// PROJ.4 definition of the map's planar projection.
    pub projection: String,
    /// Map origin.
    pub origin: MapOrigin,
    /// Map rotation in degrees.
    pub rotation: f64,
    /// Extent along x, y, z in meters.
    pub dimensions: [f64; 3],
    /// Extent along x, y, z in ticks.
    pub ticks: [u32; 3],
}

impl MapMetadata {
    /// Parse the eleven-field metadata string.
    pub fn from_appmeta(appmeta: &str) -> Result<Self> {
        let fields: Vec<&str> = appmeta.trim_end_matches('\0').trim().split('|').collect();
        if fields.len() != FIELD_COUNT {
            return Err(IndexError::Metadata(format!(
                "expected {} fields, found {}",
                FIELD_COUNT,
                fields.len()
            )));
        }

        let spacing = parse_number::<f64>("spacing", fields[4])?;
        let [longitude, latitude, depth] = parse_triple::<f64>("origin", fields[7])?;
        let rotation = parse_number::<f64>("rotation", fields[8])?;
        let dimensions = parse_triple::<f64>("dimensions", fields[9])?;
        let ticks = parse_triple::<u32>("ticks", fields[10])?;

        if spacing.is_nan() || spacing <= 0.0 {
            return Err(IndexError::Metadata(format!("spacing must be positive, got {}", spacing)));
        }
        if dimensions[0].is_nan() || dimensions[0] <= 0.0 {
            return Err(IndexError::Metadata(format!(
                "x dimension must be positive, got {}",
                dimensions[0]
            )));
        }

        Ok(Self {
            kind: fields[0].to_string(),
            description: fields[1].to_string(),
            author: fields[2].to_string(),
            date: fields[3].to_string(),
            spacing,
            schema: fields[5].to_string(),
            projection: fields[6].to_string(),
            origin: MapOrigin {
                longitude,
                latitude,
                depth,
            },
            rotation,
            dimensions,
            ticks,
        })
    }
}

impl FromStr for MapMetadata {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_appmeta(s)
    }
}

impl fmt::Display for MapMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [xd, yd, zd] = self.dimensions;
        let [xt, yt, zt] = self.ticks;
        write!(
            f,
            "{}|{}|{}|{}|{}|{}|{}|{},{},{}|{}|{},{},{}|{},{},{}",
            self.kind,
            self.description,
            self.author,
            self.date,
            self.spacing,
            self.schema,
            self.projection,
            self.origin.longitude,
            self.origin.latitude,
            self.origin.depth,
            self.rotation,
            xd,
            yd,
            zd,
            xt,
            yt,
            zt
        )
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| IndexError::Metadata(format!("cannot parse {} from '{}'", name, raw)))
}

fn parse_triple<T: FromStr + Copy>(name: &str, raw: &str) -> Result<[T; 3]> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 3 {
        return Err(IndexError::Metadata(format!(
            "{} needs three comma-separated values, got '{}'",
            name, raw
        )));
    }
    Ok([
        parse_number(name, parts[0])?,
        parse_number(name, parts[1])?,
        parse_number(name, parts[2])?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "vs30|Wills 2015 and Wald 2007|UCVM|2015-06-01|100.0|float surf; float vs30|\
+proj=aeqd +lat_0=34.0 +lon_0=-118.0 +x_0=0.0 +y_0=0.0 +ellps=WGS84 +units=m +no_defs|\
-118.1,33.9,0.0|0.0|1600.0,1600.0,100.0|2147483648,2147483648,134217728";

    #[test]
    fn test_parse_sample() {
        let meta = MapMetadata::from_appmeta(SAMPLE).unwrap();
        assert_eq!(meta.kind, "vs30");
        assert_eq!(meta.spacing, 100.0);
        assert!(meta.projection.starts_with("+proj=aeqd"));
        assert_eq!(meta.origin.longitude, -118.1);
        assert_eq!(meta.origin.latitude, 33.9);
        assert_eq!(meta.dimensions, [1600.0, 1600.0, 100.0]);
        assert_eq!(meta.ticks, [1 << 31, 1 << 31, 1 << 27]);
    }

    #[test]
    fn test_display_round_trip() {
        let meta = MapMetadata::from_appmeta(SAMPLE).unwrap();
        let again: MapMetadata = meta.to_string().parse().unwrap();
        assert_eq!(meta, again);
    }

    #[test]
    fn test_field_count() {
        let short = SAMPLE.rsplit_once('|').unwrap().0;
        assert!(matches!(
            MapMetadata::from_appmeta(short),
            Err(IndexError::Metadata(_))
        ));
        let long = format!("{}|extra", SAMPLE);
        assert!(matches!(
            MapMetadata::from_appmeta(&long),
            Err(IndexError::Metadata(_))
        ));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let bad = SAMPLE.replace("|100.0|", "|wide|");
        assert!(MapMetadata::from_appmeta(&bad).is_err());
        let zero = SAMPLE.replace("|100.0|", "|0|");
        assert!(MapMetadata::from_appmeta(&zero).is_err());
        let ticks = SAMPLE.replace("134217728", "-1");
        assert!(MapMetadata::from_appmeta(&ticks).is_err());
    }
}
